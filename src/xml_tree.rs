use {
    crate::errors::ProcessorError,
    quick_xml::{escape::escape, events::Event, Reader},
    std::collections::HashMap,
    std::fmt::Write as _,
};

/// A node in the lightweight document tree: element or text run.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Element of a parsed XML document.
///
/// Names are kept exactly as written (prefix included) so serialization
/// reproduces the source shape; the namespace URI is resolved separately at
/// parse time because routing and partitioning match on local names only.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element in the given namespace.
    pub fn new(name: &str, namespace: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Copy of this element with attributes but no children.
    pub fn shallow_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// Local part of the element name, prefix stripped.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn append(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.local_name() == local)
    }

    /// Trimmed text of the first direct child with the given local name,
    /// or an empty string when absent.
    pub fn child_text(&self, local: &str) -> String {
        self.child(local).map(|el| el.text()).unwrap_or_default()
    }

    /// First descendant with the given local name, document order.
    pub fn find_first(&self, local: &str) -> Option<&XmlElement> {
        for el in self.child_elements() {
            if el.local_name() == local {
                return Some(el);
            }
            if let Some(found) = el.find_first(local) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant with the given local name, document order.
    pub fn find_all<'a>(&'a self, local: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_all(local, &mut found);
        found
    }

    fn collect_all<'a>(&'a self, local: &str, found: &mut Vec<&'a XmlElement>) {
        for el in self.child_elements() {
            if el.local_name() == local {
                found.push(el);
            }
            el.collect_all(local, found);
        }
    }

    /// Concatenated descendant text, trimmed.
    pub fn text(&self) -> String {
        let mut buf = String::new();
        self.collect_text(&mut buf);
        buf.trim().to_string()
    }

    fn collect_text(&self, buf: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => buf.push_str(text),
                XmlNode::Element(el) => el.collect_text(buf),
            }
        }
    }

    /// Serialize this element as a self-contained XML document.
    pub fn to_xml(&self, standalone: bool) -> String {
        let mut out = String::with_capacity(1024);
        if standalone {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>");
        } else {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        }
        self.write_into(&mut out, &HashMap::new());
        out
    }

    fn write_into(&self, out: &mut String, inherited: &HashMap<String, String>) {
        out.push('<');
        out.push_str(&self.name);

        // Bindings in scope for this element and its children, prefix -> URI
        // ("" is the default namespace).
        let mut scope = inherited.clone();
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, escape(value));
            if key == "xmlns" {
                if value.is_empty() {
                    scope.remove("");
                } else {
                    scope.insert(String::new(), value.clone());
                }
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.insert(prefix.to_string(), value.clone());
            }
        }

        // Scope tracking: an element built by the partitioner, or deep-copied
        // out from under the element that carried its declaration, has a
        // resolved namespace but no declaration attribute. Bind it here unless
        // the element declared it itself or the inherited scope already does.
        let prefix = self.name.split_once(':').map(|(p, _)| p).unwrap_or("");
        let self_declared = self.attributes.iter().any(|(key, _)| match prefix {
            "" => key == "xmlns",
            prefix => key.strip_prefix("xmlns:") == Some(prefix),
        });
        if !self_declared {
            match (&self.namespace, scope.get(prefix)) {
                (Some(uri), bound) if bound.map(String::as_str) != Some(uri.as_str()) => {
                    if prefix.is_empty() {
                        let _ = write!(out, " xmlns=\"{}\"", escape(uri));
                    } else {
                        let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape(uri));
                    }
                    scope.insert(prefix.to_string(), uri.clone());
                }
                (None, Some(_)) if prefix.is_empty() => {
                    out.push_str(" xmlns=\"\"");
                    scope.remove("");
                }
                _ => {}
            }
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_into(out, &scope),
                XmlNode::Text(text) => out.push_str(&escape(text)),
            }
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// Parse an XML string into an element tree, resolving namespace URIs as it
/// goes. Malformed input fails the whole message.
pub fn parse(xml: &str) -> Result<XmlElement, ProcessorError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // Stack of namespace bindings, prefix -> URI ("" is the default namespace).
    let mut scopes: Vec<HashMap<String, String>> = vec![HashMap::new()];
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let (element, scope) = open_element(&start, scopes.last())?;
                scopes.push(scope);
                stack.push(element);
            }
            Event::Empty(start) => {
                let (element, _) = open_element(&start, scopes.last())?;
                attach(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                scopes.pop();
                match stack.pop() {
                    Some(element) => attach(element, &mut stack, &mut root),
                    None => return Err(ProcessorError::Parse("unbalanced end tag".to_string())),
                }
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            // Declarations, comments, PIs and doctypes carry no routing data.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ProcessorError::Parse("unclosed element".to_string()));
    }
    root.ok_or_else(|| ProcessorError::Parse("document has no root element".to_string()))
}

fn open_element(
    start: &quick_xml::events::BytesStart<'_>,
    parent_scope: Option<&HashMap<String, String>>,
) -> Result<(XmlElement, HashMap<String, String>), ProcessorError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut scope = parent_scope.cloned().unwrap_or_default();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(ProcessorError::from)?
            .into_owned();
        if key == "xmlns" {
            scope.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.insert(prefix.to_string(), value.clone());
        }
        attributes.push((key, value));
    }

    let prefix = name.split_once(':').map(|(p, _)| p).unwrap_or("");
    let namespace = scope.get(prefix).filter(|uri| !uri.is_empty()).cloned();

    Ok((
        XmlElement {
            name,
            namespace,
            attributes,
            children: Vec::new(),
        },
        scope,
    ))
}

fn attach(element: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<RequestPayload>
        <AppHdr xmlns="urn:head"><BizMsgIdr>MSG1</BizMsgIdr></AppHdr>
        <Document xmlns="urn:camt">
            <NtfctnToRcvStsRpt>
                <OrgnlItmAndSts><OrgnlItmId>ID1</OrgnlItmId><Amt Ccy="INR">10.00</Amt></OrgnlItmAndSts>
            </NtfctnToRcvStsRpt>
        </Document>
    </RequestPayload>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.local_name(), "RequestPayload");
        assert_eq!(doc.namespace, None);

        let document = doc.child("Document").unwrap();
        assert_eq!(document.namespace.as_deref(), Some("urn:camt"));

        let item = doc.find_first("OrgnlItmAndSts").unwrap();
        assert_eq!(item.namespace.as_deref(), Some("urn:camt"));
        assert_eq!(item.child_text("OrgnlItmId"), "ID1");
        assert_eq!(item.child_text("Amt"), "10.00");
        assert_eq!(item.child_text("Missing"), "");
    }

    #[test]
    fn test_prefixed_names_match_by_local_name() {
        let xml = r#"<ns2:Root xmlns:ns2="urn:x"><ns2:Leaf>v</ns2:Leaf></ns2:Root>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.local_name(), "Root");
        assert_eq!(doc.namespace.as_deref(), Some("urn:x"));
        assert_eq!(doc.child_text("Leaf"), "v");
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        assert!(matches!(
            parse("<RequestPayload><Open></RequestPayload>"),
            Err(ProcessorError::Parse(_))
        ));
        assert!(matches!(parse(""), Err(ProcessorError::Parse(_))));
    }

    #[test]
    fn test_serialization_declares_created_namespace_once() {
        let mut document = XmlElement::new("Document", Some("urn:camt".to_string()));
        let mut report = XmlElement::new("NtfctnToRcvStsRpt", Some("urn:camt".to_string()));
        report.append(XmlElement::new("GrpHdr", Some("urn:camt".to_string())));
        document.append(report);

        let xml = document.to_xml(true);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert_eq!(xml.matches("xmlns=\"urn:camt\"").count(), 1);
    }

    #[test]
    fn test_serialization_rebinds_orphaned_prefix() {
        // A deep copy taken from under the element that declared the prefix
        // keeps its resolved namespace; serialization must re-emit the binding.
        let source = parse(r#"<c:Document xmlns:c="urn:camt"><c:GrpHdr><c:MsgId>GRP1</c:MsgId></c:GrpHdr></c:Document>"#)
            .unwrap();
        let orphan = source.child("GrpHdr").unwrap().clone();

        let mut holder = XmlElement::new("Document", Some("urn:camt".to_string()));
        holder.append(orphan);
        let xml = holder.to_xml(false);
        assert_eq!(xml.matches("xmlns:c=\"urn:camt\"").count(), 1);

        let reparsed = parse(&xml).unwrap();
        let grp_hdr = reparsed.child("GrpHdr").unwrap();
        assert_eq!(grp_hdr.namespace.as_deref(), Some("urn:camt"));
        assert_eq!(grp_hdr.child_text("MsgId"), "GRP1");
    }

    #[test]
    fn test_serialize_parse_round_trip() {
        let doc = parse(SAMPLE).unwrap();
        let reparsed = parse(&doc.to_xml(false)).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_text_is_escaped_on_output() {
        let mut el = XmlElement::new("Note", None);
        el.children.push(XmlNode::Text("a < b & c".to_string()));
        let xml = el.to_xml(false);
        assert!(xml.contains("a &lt; b &amp; c"));
    }
}
