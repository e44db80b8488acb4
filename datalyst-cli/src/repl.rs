//! Interactive chat loop.

use std::io::{self, BufRead, Write};

use datalyst::DataAnalyst;
use datalyst::agent::QueryRequest;

use crate::render;

const HELP: &str = "\
Available commands:
  - Type your question in natural language
  - 'schema'  - Show database schema
  - 'history' - Show conversation history
  - 'metrics' - Show performance metrics
  - 'clear'   - Clear conversation history
  - 'help'    - Show this help message
  - 'exit' or 'quit' - Save state and exit

Example queries:
  - What are the top 5 products by revenue?
  - Show me total sales by region
  - How many customers signed up last month?
  - What's the average order value?";

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the command list.
    Help,
    /// Show the database schema.
    Schema,
    /// Show the current session's history.
    History,
    /// Show query metrics.
    Metrics,
    /// Clear the current session's history.
    Clear,
    /// Save state and leave.
    Exit,
    /// Anything else is a question.
    Ask(String),
}

impl Command {
    /// Parse a line; blank lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let command = match line.to_lowercase().as_str() {
            "help" => Self::Help,
            "schema" => Self::Schema,
            "history" => Self::History,
            "metrics" => Self::Metrics,
            "clear" => Self::Clear,
            "exit" | "quit" => Self::Exit,
            _ => Self::Ask(line.to_owned()),
        };
        Some(command)
    }
}

/// Line-oriented chat session around a [`DataAnalyst`].
#[derive(Debug)]
pub struct ChatRepl {
    analyst: DataAnalyst,
    visualize: bool,
}

impl ChatRepl {
    /// Wrap an analyst.
    #[must_use]
    pub const fn new(analyst: DataAnalyst) -> Self {
        Self {
            analyst,
            visualize: false,
        }
    }

    /// Attach chart suggestions to answers.
    #[must_use]
    pub const fn with_visualization(mut self, visualize: bool) -> Self {
        self.visualize = visualize;
        self
    }

    /// Give the analyst back, e.g. to close it.
    #[must_use]
    pub fn into_inner(self) -> DataAnalyst {
        self.analyst
    }

    /// Handle one command and return the text to print.
    ///
    /// Returns `None` for [`Command::Exit`].
    ///
    /// # Errors
    ///
    /// Returns an error only when the analyst has no schema loaded.
    pub async fn handle(&mut self, command: Command) -> datalyst::Result<Option<String>> {
        let output = match command {
            Command::Exit => return Ok(None),
            Command::Help => HELP.to_owned(),
            Command::Schema => self
                .analyst
                .schema()
                .map_or_else(|| "No schema loaded.".to_owned(), render::schema),
            Command::History => render::history(self.analyst.history(None)),
            Command::Metrics => self.analyst.metrics().to_string(),
            Command::Clear => {
                self.analyst.clear_history(None);
                "Conversation history cleared.".to_owned()
            }
            Command::Ask(question) => {
                let request = QueryRequest::new(question).with_visualization(self.visualize);
                let response = self.analyst.query(request).await?;
                render::response(&response)
            }
        };
        Ok(Some(output))
    }

    /// Read commands from stdin until `exit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout cannot be written.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        println!("Data Analyst AI Assistant (type 'help' for commands, 'exit' to quit)");
        if let Some(schema) = self.analyst.schema() {
            let tables: Vec<&str> = schema.table_names().collect();
            println!(
                "Connected to database with {} tables: {}",
                tables.len(),
                tables.join(", ")
            );
        }
        println!();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let Some(command) = Command::parse(&line) else {
                continue;
            };

            match self.handle(command).await {
                Ok(Some(output)) => println!("\n{output}\n"),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "main_loop_error");
                    println!("\nError: {e}\n");
                }
            }
        }

        println!("Saving state and exiting...");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_fs::TempDir;
    use datalyst::AnalystConfig;
    use datalyst::database::SqliteDatabase;
    use datalyst::database::demo::create_demo_database;
    use datalyst::providers::MockModel;

    use super::*;

    async fn repl(temp: &TempDir, model: MockModel) -> ChatRepl {
        let path = temp.path().join("sample.db");
        create_demo_database(&path).unwrap();
        let analyst = DataAnalyst::builder()
            .database(SqliteDatabase::open(&path).unwrap())
            .model(model)
            .config(AnalystConfig::default().with_persist_on_close(false))
            .build()
            .await
            .unwrap();
        ChatRepl::new(analyst)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  "), None);
        assert_eq!(Command::parse("EXIT"), Some(Command::Exit));
        assert_eq!(Command::parse("quit\n"), Some(Command::Exit));
        assert_eq!(Command::parse("Schema"), Some(Command::Schema));
        assert_eq!(
            Command::parse(" How many customers? "),
            Some(Command::Ask("How many customers?".into()))
        );
    }

    #[tokio::test]
    async fn test_question_then_history_and_clear() {
        let temp = TempDir::new().unwrap();
        let model = MockModel::new().with_sql("SELECT COUNT(*) AS n FROM customers");
        let mut repl = repl(&temp, model).await;

        let answer = repl
            .handle(Command::Ask("How many customers?".into()))
            .await
            .unwrap()
            .unwrap();
        assert!(answer.contains("SELECT COUNT(*) AS n FROM customers"));
        assert!(answer.contains("100"));

        let history = repl.handle(Command::History).await.unwrap().unwrap();
        assert!(history.contains("USER: How many customers?"));

        repl.handle(Command::Clear).await.unwrap();
        let history = repl.handle(Command::History).await.unwrap().unwrap();
        assert!(history.contains("(empty)"));
    }

    #[tokio::test]
    async fn test_schema_metrics_and_exit() {
        let temp = TempDir::new().unwrap();
        let mut repl = repl(&temp, MockModel::new().with_sql("DROP TABLE sales")).await;

        let schema = repl.handle(Command::Schema).await.unwrap().unwrap();
        assert!(schema.contains("Table: orders"));

        let rejected = repl.handle(Command::Ask("drop sales".into())).await.unwrap().unwrap();
        assert!(rejected.starts_with("Error at validation stage:"));

        let metrics = repl.handle(Command::Metrics).await.unwrap().unwrap();
        assert!(metrics.contains("Validation errors: 1"));

        assert_eq!(repl.handle(Command::Exit).await.unwrap(), None);
    }
}
