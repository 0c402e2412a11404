use serde_json::Value;

use kernel_space::DateRange;

const TIMELINE_DOCUMENT_LIMIT: usize = 5;

pub fn analyze(query: &str, context: Option<&str>) -> String {
    let context = context
        .filter(|context| !context.trim().is_empty())
        .unwrap_or("No additional context provided");
    format!(
        "Analyze the following financial documents and answer the query:\n\n\
         Query: {query}\n\n\
         Context: {context}\n\n\
         Please provide a detailed analysis with specific references to the documents."
    )
}

pub fn timeline(documents: &[Value], date_range: Option<&DateRange>) -> String {
    let head = &documents[..documents.len().min(TIMELINE_DOCUMENT_LIMIT)];
    let documents = serde_json::to_string(head).unwrap_or_default();
    let start = date_range
        .and_then(|range| range.start.as_deref())
        .unwrap_or("Any");
    let end = date_range
        .and_then(|range| range.end.as_deref())
        .unwrap_or("Any");
    format!(
        "Extract timeline events from these documents:\n\n\
         Documents: {documents}\n\n\
         Date Range: {start} to {end}\n\n\
         Extract:\n\
         1. Wire transfers with amounts, dates, accounts\n\
         2. Property purchases\n\
         3. Legal filings\n\
         4. Bank transactions over $10,000\n\
         5. Corporate events\n\n\
         Return as JSON array with fields: date, type, description, amount, source_account, destination_account"
    )
}

pub fn exhibits(documents: &[Value], case_info: &Value, purpose: &str) -> String {
    let caption = text_field(case_info, "caption");
    let case_number = text_field(case_info, "case_number");
    let documents = serde_json::to_string(documents).unwrap_or_default();
    format!(
        "Generate a Cook County court-compliant exhibit package:\n\n\
         Case: {caption}\n\
         Case Number: {case_number}\n\
         Purpose: {purpose}\n\n\
         Documents to include: {documents}\n\n\
         Create:\n\
         1. Cover letter\n\
         2. Table of contents\n\
         3. Exhibit authentication affidavits\n\
         4. Certificate of service\n\
         5. Formatting instructions per Cook County requirements\n\n\
         Format with:\n\
         - 8.5\" x 11\" pages\n\
         - 1\" margins\n\
         - Times New Roman 12pt\n\
         - Double spacing\n\
         - Sequential exhibit numbering"
    )
}

pub fn fill_form(template: &str, data: &Value) -> String {
    let data = serde_json::to_string_pretty(data).unwrap_or_default();
    format!(
        "Fill this form template with the provided data:\n\n\
         Template:\n{template}\n\n\
         Data:\n{data}\n\n\
         Instructions:\n\
         1. Replace all placeholders with appropriate data\n\
         2. Ensure legal formatting\n\
         3. Add current date where needed\n\
         4. Verify all fields are completed"
    )
}

/// Known commands get a dedicated prompt; anything else is passed through
/// with its parameters.
pub fn command(command: &str, parameters: &Value) -> String {
    match command {
        "trace_funds" => format!(
            "Trace fund flow from {} to {}. \
             Include all intermediate steps, amounts, dates, and institutions.",
            text_field(parameters, "source_account"),
            text_field(parameters, "destination")
        ),
        "analyze_transactions" => format!(
            "Analyze transactions for {}. \
             Look for patterns, anomalies, and compliance issues.",
            text_field(parameters, "account")
        ),
        "detect_patterns" => "Detect financial patterns in the data. \
             Look for structured transactions, unusual timing, related parties."
            .to_string(),
        "cross_reference_database" => "Cross-reference with connected database. \
             Find matching transactions, property records, legal filings."
            .to_string(),
        other => format!(
            "Execute command: {other} with parameters: {}",
            serde_json::to_string(parameters).unwrap_or_default()
        ),
    }
}

fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "unspecified".to_string(),
        Some(other) => other.to_string(),
    }
}
