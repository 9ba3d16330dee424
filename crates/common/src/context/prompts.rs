//! Prompt templates sent to the generative model

use crate::models::ClauseRecord;

/// A filled prompt, ready to render
#[derive(Debug, Clone, Copy)]
pub enum Prompt<'a> {
    /// Q&A over excerpts selected from the reference library
    GroundedAnswer { context: &'a str, question: &'a str },
    /// Q&A over chunks of a single uploaded document
    DocumentAnswer { context: &'a str, question: &'a str },
    /// Conversation without retrieval
    OpenChat { question: &'a str },
    /// Structured clause extraction in the CLAUSE_START/CLAUSE_END format
    ClauseExtraction { document: &'a str },
    /// Free-text comparison of two clause lists
    ClauseComparison { first: &'a [ClauseRecord], second: &'a [ClauseRecord] },
    /// Plain-language summary
    Summary { text: &'a str },
}

/// Which sampling profile a prompt uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Answer,
    Clause,
}

impl Prompt<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Prompt::GroundedAnswer { .. } => "grounded_answer",
            Prompt::DocumentAnswer { .. } => "document_answer",
            Prompt::OpenChat { .. } => "open_chat",
            Prompt::ClauseExtraction { .. } => "clause_extraction",
            Prompt::ClauseComparison { .. } => "clause_comparison",
            Prompt::Summary { .. } => "summary",
        }
    }

    pub fn kind(&self) -> PromptKind {
        match self {
            Prompt::ClauseExtraction { .. } | Prompt::ClauseComparison { .. } => PromptKind::Clause,
            _ => PromptKind::Answer,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Prompt::GroundedAnswer { context, question } => format!(
                "You are a legal assistant. Use the following legal document excerpts to answer the user's question.\n\n\
                ---DOCUMENT EXCERPTS---\n\
                {context}\n\
                -----------------------\n\n\
                Question: {question}\n\n\
                Provide a legally accurate, helpful, and context-aware answer.\n"
            ),
            Prompt::DocumentAnswer { context, question } => format!(
                "Use the following pieces of context to answer the question at the end. \
                If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
                {context}\n\n\
                Question: {question}\n\
                Helpful Answer:"
            ),
            Prompt::OpenChat { question } => format!(
                "You are a helpful AI legal assistant. Provide professional, accurate, and helpful legal guidance.\n\
                Be conversational but maintain professionalism. If a question requires specific legal documents \
                or analysis, suggest the user upload a document or use the legal database.\n\n\
                User Question: {question}\n\n\
                Provide a helpful, informative response:\n"
            ),
            Prompt::ClauseExtraction { document } => format!(
                "You are a legal document analysis expert. Analyze the following legal document and extract key clauses.\n\n\
                For each clause found, provide the information in this EXACT format:\n\n\
                CLAUSE_START\n\
                Type: [Clause type like Payment, Termination, Liability, etc.]\n\
                Text: [The actual clause text from the document]\n\
                Key Points: [Main points in plain text, no bullet points or asterisks]\n\
                Risk Level: [High/Medium/Low]\n\
                Analysis: [Brief analysis in plain text, no formatting symbols]\n\
                CLAUSE_END\n\n\
                Document Text:\n\
                {document}\n\n\
                IMPORTANT FORMATTING RULES:\n\
                - Use plain text only, no asterisks (*), bullet points, or special formatting\n\
                - Each clause must start with CLAUSE_START and end with CLAUSE_END\n\
                - Use simple sentences and avoid excessive formatting\n\
                - Focus on the most important and legally significant clauses\n"
            ),
            Prompt::ClauseComparison { first, second } => format!(
                "Compare the following clauses from two different legal documents and provide:\n\
                1. Common clause types\n\
                2. Differences in terms\n\
                3. Risk comparison\n\
                4. Recommendations for alignment\n\n\
                Document 1 Clauses:\n\
                {}\n\
                Document 2 Clauses:\n\
                {}\n\
                Provide a detailed comparison analysis.\n",
                render_clauses(first),
                render_clauses(second),
            ),
            Prompt::Summary { text } => {
                format!("Summarize the following legal text in simple terms:\n\n{text}")
            }
        }
    }
}

fn render_clauses(clauses: &[ClauseRecord]) -> String {
    if clauses.is_empty() {
        return "(none)\n".to_string();
    }

    clauses
        .iter()
        .enumerate()
        .map(|(i, clause)| {
            format!(
                "{}. Type: {}\n   Text: {}\n   Key Points: {}\n   Risk Level: {}\n   Analysis: {}\n",
                i + 1,
                clause.clause_type,
                clause.text,
                clause.key_points,
                clause.risk_level,
                clause.analysis
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;

    #[test]
    fn test_grounded_prompt_layout() {
        let prompt = Prompt::GroundedAnswer {
            context: "Section 379. Punishment for theft.",
            question: "What is the penalty for theft?",
        }
        .render();
        assert!(prompt.contains("---DOCUMENT EXCERPTS---\nSection 379. Punishment for theft.\n"));
        assert!(prompt.contains("Question: What is the penalty for theft?"));
    }

    #[test]
    fn test_extraction_prompt_requests_delimiters() {
        let prompt = Prompt::ClauseExtraction { document: "The tenant shall pay rent." }.render();
        assert!(prompt.contains("CLAUSE_START\nType:"));
        assert!(prompt.contains("Document Text:\nThe tenant shall pay rent."));
        assert_eq!(Prompt::ClauseExtraction { document: "" }.kind(), PromptKind::Clause);
    }

    #[test]
    fn test_comparison_lists_both_documents() {
        let a = vec![ClauseRecord {
            clause_type: "Payment".into(),
            risk_level: RiskLevel::High,
            ..Default::default()
        }];
        let prompt = Prompt::ClauseComparison { first: &a, second: &[] }.render();
        assert!(prompt.contains("Document 1 Clauses:\n1. Type: Payment"));
        assert!(prompt.contains("\n   Risk Level: High\n   Analysis: "));
        assert!(prompt.contains("Document 2 Clauses:\n(none)"));
    }
}
