use crate::summarization::SummarizationRequest;

/// System-role framing sent with every summarization request.
pub const SYSTEM_PROMPT: &str = "You are a helpful legal assistant.";

/// Instruction placed ahead of the extracted document text.
pub const INSTRUCTION: &str = "You are a legal assistant. Summarize the following legal document and extract key clauses, dates, parties involved, and obligations:";

/// Embed extracted text into the fixed instruction template.
pub fn build_summary_request(extracted_text: &str) -> SummarizationRequest {
    SummarizationRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: format!("{INSTRUCTION}\n\n{extracted_text}"),
    }
}
