//! The assistant persona and the system segment built around it.

use lumen_core::retrieval::RetrievedDocument;

/// Introductory persona paragraph.
pub const DEFAULT_PERSONA: &str = "You are a knowledgeable and empathetic assistant specializing in bipolar disorder. You provide accurate, up-to-date information based on current research and clinical guidelines.";

const RESEARCH_HEADER: &str = "Relevant research context:";

const CITE_INSTRUCTION: &str = "Use this research context to inform your response. Always cite sources when referencing specific studies.";

const GUIDELINES: &str = "Guidelines for your responses:
- Be empathetic and understanding
- Provide evidence-based information
- Always recommend consulting healthcare professionals for medical decisions
- Acknowledge the complexity and variability of bipolar disorder experiences
- Keep responses concise but informative
- Avoid giving specific medical diagnoses or prescribing treatments
- When referencing research, include citations
- Be sensitive to mood episodes and crisis situations

If asked about topics unrelated to bipolar disorder, politely redirect the conversation back to bipolar disorder-related topics.

Do not assume the human has bipolar disorder or make diagnostic assessments.";

/// Render the system segment text.
///
/// The research block is present only when `retrieved` is non-empty; each
/// document is numbered from 1 and rendered as its citation line followed
/// by its content.
pub fn system_text(persona: &str, retrieved: &[RetrievedDocument]) -> String {
    let mut text = String::from(persona);

    if !retrieved.is_empty() {
        text.push_str("\n\n");
        text.push_str(RESEARCH_HEADER);
        text.push('\n');
        for (index, doc) in retrieved.iter().enumerate() {
            text.push_str(&format!(
                "\n{}. {}\n{}\n",
                index + 1,
                doc.citation,
                doc.content
            ));
        }
        text.push('\n');
        text.push_str(CITE_INSTRUCTION);
    }

    text.push_str("\n\n");
    text.push_str(GUIDELINES);
    text
}
