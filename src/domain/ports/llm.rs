use crate::domain::{errors::DomainError, GenerationSession, TextStream};
use async_trait::async_trait;
use futures::TryStreamExt;

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Sends the session and returns the answer as it is produced.
    ///
    /// Provider errors detected before the first fragment are returned here;
    /// later ones surface as an `Err` item in the stream.
    async fn generate_stream(&self, session: &GenerationSession)
        -> Result<TextStream, DomainError>;

    /// Sends the session and waits for the complete answer.
    async fn generate(&self, session: &GenerationSession) -> Result<String, DomainError> {
        let stream = self.generate_stream(session).await?;
        stream.try_collect::<Vec<_>>().await.map(|parts| parts.concat())
    }
}
