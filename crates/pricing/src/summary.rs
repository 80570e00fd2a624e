use crate::records::{PriceFilter, PriceRecord};

/// Renders a record list into the short text block used for the
/// price-summary conversational turn: cheapest SKUs first, one line each,
/// capped at `max_lines` with an explicit remainder note.
pub fn summarize(filter: &PriceFilter, records: &[PriceRecord], max_lines: usize) -> String {
    if records.is_empty() {
        return format!(
            "No retail prices were found for `{}`{} in {}. \
             The service name may be misspelled, or it is not offered at that filter.",
            filter.service_name,
            region_clause(filter),
            filter.currency
        );
    }

    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.unit_price.cmp(&b.unit_price));

    let mut lines = vec![format!(
        "Retail prices for `{}`{} in {} ({} record{}):",
        filter.service_name,
        region_clause(filter),
        filter.currency,
        records.len(),
        if records.len() == 1 { "" } else { "s" }
    )];

    let shown = max_lines.max(1).min(sorted.len());
    for record in &sorted[..shown] {
        lines.push(format!(
            "- {}: {} {} per {}{}",
            display_sku(record),
            record.unit_price,
            record.currency,
            record.unit_of_measure,
            if record.region.is_empty() { String::new() } else { format!(" ({})", record.region) }
        ));
    }

    if sorted.len() > shown {
        lines.push(format!("... and {} more SKUs not shown.", sorted.len() - shown));
    }

    lines.join("\n")
}

fn display_sku(record: &PriceRecord) -> String {
    match (record.sku_name.is_empty(), record.product_name.is_empty()) {
        (false, false) => format!("{} / {}", record.product_name, record.sku_name),
        (false, true) => record.sku_name.clone(),
        (true, false) => record.product_name.clone(),
        (true, true) => record.service_name.clone(),
    }
}

fn region_clause(filter: &PriceFilter) -> String {
    filter.region.as_deref().map(|region| format!(" in region `{region}`")).unwrap_or_default()
}
