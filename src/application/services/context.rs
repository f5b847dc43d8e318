use serde::Deserialize;

use crate::domain::{
    DomainError, GenerationSession, GroundedContext, RetrievalMatch, StaticCorpus,
};

const DEFAULT_SYSTEM: &str = r#"You are a helpful and knowledgeable assistant for students using a "Rate My Professor" platform. Your primary task is to assist students in finding information about professors based on their queries. Use the following review information to answer queries about professors:

{reviews}

Additionally, you should:

1. Be Conversational: Engage in natural, friendly conversation. Respond appropriately to social cues and casual remarks.

2. Stay on Topic: Only provide information about professors when explicitly asked. Don't offer unsolicited information about professors.

3. Understand Context: Pay attention to the flow of conversation. If a user thanks you or indicates they're done, respond appropriately without adding new information.

4. Be Concise: Provide brief, to-the-point answers unless asked for more details.

5. Ask for Clarification: If a query is ambiguous, ask for more details to ensure you understand the user's intent.

6. Be Honest: If you can't find information related to a query, politely inform the user.

Remember, your primary goal is to be helpful and maintain a natural conversation, providing information about professors only when directly asked."#;

const DEFAULT_ACKNOWLEDGMENT: &str = "Understood. I'm ready to assist students with their queries about professors using the Rate My Professor platform. How can I help you today?";

const DEFAULT_INSTRUCTION: &str = "Please answer the query using both the information from the {source} data provided in the system prompt and the relevant search results above. If the information isn't found in either source, please state that clearly.";

const DEFAULT_NO_MATCHES: &str = "No matching reviews were found in the search index.";

/// Prompt text used to build the generation session.
///
/// `system` must contain `{reviews}`, which is replaced by the corpus JSON.
/// `instruction` may contain `{source}`, replaced by the corpus file name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    pub system: String,
    pub acknowledgment: String,
    pub instruction: String,
    pub no_matches: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            acknowledgment: DEFAULT_ACKNOWLEDGMENT.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            no_matches: DEFAULT_NO_MATCHES.to_string(),
        }
    }
}

/// Builds the prompts sent to the generator. Performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    templates: PromptTemplates,
}

impl ContextAssembler {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// Renders the system instruction with the whole corpus inlined.
    pub fn system_instruction(&self, corpus: &StaticCorpus) -> Result<String, DomainError> {
        if !self.templates.system.contains("{reviews}") {
            return Err(DomainError::config(
                "system prompt template is missing the {reviews} placeholder",
            ));
        }

        Ok(self
            .templates
            .system
            .replace("{reviews}", &corpus.reviews_json()?))
    }

    /// Renders the per-request message: the query, every match in retrieval
    /// order, then the answering instruction.
    pub fn assemble(
        &self,
        corpus: &StaticCorpus,
        matches: &[RetrievalMatch],
        query: &str,
    ) -> GroundedContext {
        let mut text = String::new();
        text.push_str(&format!("User Query: {}\n\n", query));
        text.push_str("Relevant reviews from the search index:\n");

        if matches.is_empty() {
            text.push_str(&self.templates.no_matches);
            text.push('\n');
        } else {
            for m in matches {
                text.push_str(&format!(
                    "\nProfessor: {}\nReview: {}\nSubject: {}\nStars: {}\n",
                    m.id, m.metadata.review, m.metadata.subject, m.metadata.stars
                ));
            }
        }

        text.push('\n');
        text.push_str(&self.templates.instruction.replace("{source}", corpus.source()));

        GroundedContext::new(text)
    }

    pub fn session(&self, system_instruction: &str, context: GroundedContext) -> GenerationSession {
        GenerationSession::seeded(system_instruction, &self.templates.acknowledgment, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatRole, ReviewMetadata, ReviewRecord};

    fn corpus() -> StaticCorpus {
        StaticCorpus::new(
            "reviews.json",
            vec![ReviewRecord::new("Dr. C", "Engaging seminars.", "History", 4.0)],
        )
    }

    fn matched(id: &str, review: &str, subject: &str, stars: f32, rank: usize) -> RetrievalMatch {
        RetrievalMatch {
            id: id.to_string(),
            metadata: ReviewMetadata {
                review: review.to_string(),
                subject: subject.to_string(),
                stars: stars.into(),
            },
            rank,
            score: None,
        }
    }

    fn calculus_matches() -> Vec<RetrievalMatch> {
        vec![
            matched("Dr. A", "Explains limits beautifully.", "Calculus", 5.0, 1),
            matched("Dr. B", "Disorganized and late.", "Calculus", 2.0, 2),
        ]
    }

    #[test]
    fn test_assemble_includes_every_match_field() {
        let assembler = ContextAssembler::default();
        let context = assembler.assemble(
            &corpus(),
            &calculus_matches(),
            "Who teaches good Calculus classes?",
        );
        let text = context.as_str();

        assert!(text.starts_with("User Query: Who teaches good Calculus classes?"));
        assert!(text.contains("Professor: Dr. A\nReview: Explains limits beautifully.\nSubject: Calculus\nStars: 5\n"));
        assert!(text.contains("Professor: Dr. B\nReview: Disorganized and late.\nSubject: Calculus\nStars: 2\n"));
        assert!(text.contains("reviews.json"));
        assert!(text.contains("state that clearly"));
    }

    #[test]
    fn test_assemble_exact_layout() {
        let assembler = ContextAssembler::new(PromptTemplates {
            instruction: "Use {source}.".to_string(),
            no_matches: "None found.".to_string(),
            ..PromptTemplates::default()
        });

        let with_match = assembler.assemble(
            &corpus(),
            &[matched("Dr. A", "Clear.", "Calculus", 4.5, 1)],
            "calculus?",
        );
        assert_eq!(
            with_match.as_str(),
            "User Query: calculus?\n\nRelevant reviews from the search index:\n\nProfessor: Dr. A\nReview: Clear.\nSubject: Calculus\nStars: 4.5\n\nUse reviews.json."
        );

        let without = assembler.assemble(&corpus(), &[], "calculus?");
        assert_eq!(
            without.as_str(),
            "User Query: calculus?\n\nRelevant reviews from the search index:\nNone found.\n\nUse reviews.json."
        );
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let assembler = ContextAssembler::default();
        let matches = calculus_matches();

        let first = assembler.assemble(&corpus(), &matches, "calculus?");
        let second = assembler.assemble(&corpus(), &matches, "calculus?");

        assert_eq!(first.as_str().as_bytes(), second.as_str().as_bytes());
    }

    #[test]
    fn test_assemble_preserves_order_and_duplicates() {
        let assembler = ContextAssembler::default();
        let matches = vec![
            matched("Dr. Z", "last alphabetically", "Art", 3.0, 1),
            matched("Dr. A", "first alphabetically", "Art", 4.0, 2),
            matched("Dr. Z", "second review", "Art", 1.0, 3),
        ];

        let context = assembler.assemble(&corpus(), &matches, "art?");
        let text = context.as_str();

        let z1 = text.find("last alphabetically").unwrap();
        let a = text.find("first alphabetically").unwrap();
        let z2 = text.find("second review").unwrap();
        assert!(z1 < a && a < z2);
        assert_eq!(text.matches("Professor: Dr. Z").count(), 2);
    }

    #[test]
    fn test_assemble_without_matches_falls_back_to_corpus() {
        let assembler = ContextAssembler::default();
        let context = assembler.assemble(&corpus(), &[], "anything about history?");
        let text = context.as_str();

        assert!(!text.contains("Professor:"));
        assert!(text.contains(DEFAULT_NO_MATCHES));
        assert!(text.contains("reviews.json data provided in the system prompt"));
    }

    #[test]
    fn test_system_instruction_inlines_corpus() {
        let assembler = ContextAssembler::default();
        let system = assembler.system_instruction(&corpus()).unwrap();

        assert!(system.contains("\"professor\": \"Dr. C\""));
        assert!(system.contains("Stay on Topic"));
        assert!(!system.contains("{reviews}"));
    }

    #[test]
    fn test_system_instruction_requires_placeholder() {
        let assembler = ContextAssembler::new(PromptTemplates {
            system: "no placeholder here".to_string(),
            ..PromptTemplates::default()
        });

        let err = assembler.system_instruction(&corpus()).unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn test_session_is_seeded_with_two_turns() {
        let assembler = ContextAssembler::default();
        let context = assembler.assemble(&corpus(), &[], "hi");
        let session = assembler.session("SYSTEM", context.clone());

        assert_eq!(session.history()[0].role, ChatRole::User);
        assert_eq!(session.history()[0].text, "SYSTEM");
        assert_eq!(session.history()[1].role, ChatRole::Model);
        assert_eq!(session.history()[1].text, DEFAULT_ACKNOWLEDGMENT);
        assert_eq!(session.message(), &context);
    }
}
