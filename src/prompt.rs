use std::io::{self, BufRead, IsTerminal, StdinLock, Write};

/// Line source for the REPL. The prompt is only drawn for a terminal.
pub struct ShellPrompt<R> {
    prompt: String,
    interactive: bool,
    input: R,
}

impl ShellPrompt<StdinLock<'static>> {
    pub fn stdin(prompt: &str) -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        ShellPrompt::new(prompt, interactive, stdin.lock())
    }
}

impl<R: BufRead> ShellPrompt<R> {
    pub fn new(prompt: &str, interactive: bool, input: R) -> Self {
        ShellPrompt {
            prompt: prompt.to_string(),
            interactive,
            input,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn show_prompt(&self) {
        if self.interactive {
            let mut out = io::stdout();
            let _ = out.write_all(self.prompt.as_bytes());
            let _ = out.flush();
        }
    }

    /// Next line without its terminator, or `None` at end of input.
    /// Invalid UTF-8 is replaced rather than ending the input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let bytes_read = self.input.read_until(b'\n', &mut buf)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}
