use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::GenerationModel;

/// Placeholder in the argument list replaced by the requested length
pub const MAX_LENGTH_PLACEHOLDER: &str = "{max_length}";

/// Generation model backed by an external program
///
/// The prompt is written to the program's stdin and the completion is read
/// from its stdout. Any argument containing `{max_length}` has it replaced
/// by the length for that call.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
}

impl CommandModel {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a whitespace-separated command line such as `llm-cli --tokens {max_length}`
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next().context("Model command is empty")?;
        Ok(Self::new(program).with_args(parts))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn build_args(&self, max_length: usize) -> Vec<String> {
        let length = max_length.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(MAX_LENGTH_PLACEHOLDER, &length))
            .collect()
    }
}

#[async_trait]
impl GenerationModel for CommandModel {
    async fn generate(&self, prompt: &str, max_length: usize) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(max_length));
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running model command: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute model command {}", self.program))?;

        // Feed stdin from its own task so a chatty child cannot block on a full stdout pipe
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            tokio::spawn(async move {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await
            })
        });

        let output = child
            .wait_with_output()
            .await
            .context("Failed to read model output")?;

        if let Some(writer) = writer {
            if let Err(e) = writer.await.context("Prompt writer panicked")? {
                tracing::debug!("Model command closed stdin early: {}", e);
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!("model stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            bail!("Model command {} exited with {}", self.program, output.status);
        }

        let completion = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if completion.is_empty() {
            bail!("Model command {} produced no output", self.program);
        }

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let model = CommandModel::from_command_line("llm --tokens {max_length} --quiet").unwrap();
        assert_eq!(model.program(), "llm");
        assert_eq!(model.build_args(600), vec!["--tokens", "600", "--quiet"]);

        assert!(CommandModel::from_command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_prompt_is_piped_through() {
        let model = CommandModel::new("cat");
        let completion = model.generate("def sort_list(xs):\n", 500).await.unwrap();
        assert_eq!(completion, "def sort_list(xs):");
    }

    #[tokio::test]
    async fn test_max_length_is_substituted() {
        let model = CommandModel::new("sh").with_args(["-c", "echo tokens={max_length}"]);
        assert_eq!(model.generate("ignored", 642).await.unwrap(), "tokens=642");
    }

    #[tokio::test]
    async fn test_failures_are_errors() {
        let failing = CommandModel::new("sh").with_args(["-c", "exit 3"]);
        assert!(failing.generate("x", 500).await.is_err());

        let silent = CommandModel::new("sh").with_args(["-c", "true"]);
        assert!(silent.generate("x", 500).await.is_err());

        let missing = CommandModel::new("definitely-not-a-model-binary");
        assert!(missing.generate("x", 500).await.is_err());
    }
}
