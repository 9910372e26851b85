//! LLM prompt engineering for archival record extraction

use arhiv_domain::{FieldSpec, ARCHIVAL_FIELDS};
use arhiv_llm::ChatRequest;
use arhiv_stream::RECORDS_KEY;

const SYSTEM_INSTRUCTIONS: &str = "You are an expert archival data extraction assistant. \
Extract structured archival records from documents following the Croatian archival standard format.";

const USER_INSTRUCTIONS: &str = "Extract archival records from this document. \
Follow the Croatian archival standard and fill every field in the schema if possible. \
Use empty strings where information is missing.

Extract ALL records found in the document. Do not limit the number of records - extract everything.";

const OUTPUT_FORMAT_REMINDER: &str =
    "Use empty strings for missing fields. Return ONLY the JSON, nothing else.";

/// Builds the system and user prompts for one document
pub struct PromptBuilder<'a> {
    text: &'a str,
    fields: &'a [FieldSpec],
}

impl<'a> PromptBuilder<'a> {
    /// Prompt for `text` using the standard archival schema
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            fields: &ARCHIVAL_FIELDS,
        }
    }

    /// Ask for a different set of fields
    pub fn with_fields(mut self, fields: &'a [FieldSpec]) -> Self {
        self.fields = fields;
        self
    }

    /// System prompt: role plus the exact JSON shape expected
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(SYSTEM_INSTRUCTIONS);
        prompt.push_str("\n\n");
        prompt.push_str("You must respond with ONLY a valid JSON object, no other text. ");
        prompt.push_str("Follow this exact schema:\n\n");
        prompt.push_str(&self.schema());
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    /// User prompt: task plus the document content
    pub fn user_prompt(&self) -> String {
        format!("{}\n\nDocument content:\n{}", USER_INSTRUCTIONS, self.text)
    }

    /// Build the complete request
    pub fn build(&self) -> ChatRequest {
        ChatRequest::new(self.system_prompt(), self.user_prompt())
    }

    /// Example object listing every field with its description
    fn schema(&self) -> String {
        let mut schema = format!("{{\n  \"{}\": [\n    {{\n", RECORDS_KEY);
        for (i, field) in self.fields.iter().enumerate() {
            let comma = if i + 1 < self.fields.len() { "," } else { "" };
            schema.push_str(&format!(
                "      \"{}\": \"string ({})\"{}\n",
                field.key, field.description, comma
            ));
        }
        schema.push_str("    }\n  ]\n}");
        schema
    }
}
