use crate::core::schema::Field;
use crate::payload::PAGE_BREAK;

/// System prompt carrying the schema and the normalization rules the oracle
/// is expected to apply.
pub fn system_prompt() -> String {
    let schema = Field::ALL
        .iter()
        .map(|field| format!("  \"{}\": \"string or NA\"", field.as_str()))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "You are an expert at extracting structured data from Indian insurance policy documents.\n\
         \n\
         Extract EXACTLY these {count} fields and return ONLY a flat JSON object \
         (no markdown, no explanation, no nested objects):\n\
         \n\
         {{\n{schema}\n}}\n\
         \n\
         Rules:\n\
         1. If a field is not found, use \"NA\" (not null, not an empty string).\n\
         2. Policyholder = the customer who bought the policy (also called insured, proposer).\n\
         3. Intermediary = the agent, broker or POS who sold the policy.\n\
         4. Total_premium_paid = final amount including all taxes/GST.\n\
         5. Base_premium = premium before taxes.\n\
         6. Dates must be in DD/MM/YYYY format.\n\
         7. The text may contain the marker {marker} between pages.",
        count = Field::ALL.len(),
        marker = PAGE_BREAK,
    )
}

pub fn user_prompt(payload: &str) -> String {
    format!("Extract policy data from this text:\n\n{payload}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_lists_every_field() {
        let prompt = system_prompt();
        for field in Field::ALL {
            assert!(prompt.contains(field.as_str()), "missing {}", field.as_str());
        }
        assert!(prompt.contains("DD/MM/YYYY"));
    }
}
