use crate::cli::actions::Action;
use crate::mendo;
use anyhow::Result;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, dsn, config } => {
            // Parse the DSN up front so a malformed connection string fails
            // at startup instead of at first pool checkout.
            let dsn = Url::parse(&dsn)?;

            mendo::new(port, dsn.to_string(), config).await?;
        }
    }

    Ok(())
}
