pub mod server;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}

impl Action {
    /// # Errors
    /// Returns an error if the selected action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
        }
    }
}
