use {
    crate::classifier::Channel,
    crate::errors::ProcessorError,
    crate::extractor::Camt59Fields,
    rust_decimal::Decimal,
    std::str::FromStr,
};

/// Sum the settlement amounts of every item routed to `channel`.
///
/// A non-numeric amount fails the whole message rather than silently
/// under-reporting a channel total.
pub fn sum_amounts(items: &[Camt59Fields], channel: Channel) -> Result<Decimal, ProcessorError> {
    let mut total = Decimal::ZERO;
    for item in items.iter().filter(|item| item.channel == channel) {
        total += parse_amount(item)?;
    }
    Ok(total)
}

/// Settlement amount of one item as a decimal.
pub fn parse_amount(item: &Camt59Fields) -> Result<Decimal, ProcessorError> {
    Decimal::from_str(&item.amount).map_err(|err| {
        ProcessorError::Parse(format!(
            "non-numeric amount {:?} on item {:?}: {err}",
            item.amount, item.orgnl_itm_id
        ))
    })
}
