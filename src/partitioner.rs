use {
    crate::classifier::effective_routing_digit,
    crate::xml_tree::XmlElement,
};

/// Rebuild a channel-scoped sub-document from the original tree.
///
/// Pure function: the original is never mutated, and the output is a
/// self-contained document restricted to items whose routing digit falls in
/// `[min_digit, max_digit]`. Reference groups and items keep their original
/// relative order. The digit is re-derived here with the same policy the
/// classifier uses, so a partition over the EPH range captures the items the
/// classifier degraded to EPH.
///
/// Output shape mirrors a trimmed original: root attributes are kept, the
/// application header and first group header are copied verbatim, and a new
/// `Document` block is created under the original namespace URI. An empty
/// partition yields a document without an items container; a source without
/// a `Document` block yields root plus header only.
pub fn partition(original: &XmlElement, min_digit: u8, max_digit: u8) -> XmlElement {
    let mut root = original.shallow_copy();

    if let Some(app_hdr) = original.child("AppHdr") {
        root.append(app_hdr.clone());
    }

    let Some(original_document) = original.child("Document") else {
        return root;
    };
    let ns_uri = original_document.namespace.clone();

    let mut new_document = XmlElement::new("Document", ns_uri.clone());
    let mut report = XmlElement::new("NtfctnToRcvStsRpt", ns_uri.clone());

    if let Some(grp_hdr) = original_document.find_first("GrpHdr") {
        report.append(grp_hdr.clone());
    }

    let mut container = XmlElement::new("OrgnlNtfctnAndSts", ns_uri.clone());
    for reference in original_document.find_all("OrgnlNtfctnRef") {
        // Agent identification is shared across all items of one reference
        // group; the first occurrence travels with every matching item.
        let agent = reference.find_first("DbtrAgt");

        for item in reference.find_all("OrgnlItmAndSts") {
            let digit = effective_routing_digit(&item.child_text("OrgnlItmId"));
            if digit < min_digit || digit > max_digit {
                continue;
            }

            let mut new_reference = XmlElement::new("OrgnlNtfctnRef", ns_uri.clone());
            if let Some(agent) = agent {
                new_reference.append(agent.clone());
            }
            new_reference.append(item.clone());
            container.append(new_reference);
        }
    }

    if !container.children.is_empty() {
        report.append(container);
    }
    new_document.append(report);
    root.append(new_document);
    root
}
