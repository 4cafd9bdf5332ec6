//! Request sources.
//!
//! A source yields requests until it is exhausted. A record that fails to
//! parse or validate ends the stream the same way end-of-input does; the
//! reason is only logged.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use tracing::{debug, warn};

use super::{IntegrationRequest, PROMPT, parse_fields};

/// Producer of validated integration requests.
pub trait RequestSource: Send {
    /// Next request, or `None` once the input is exhausted or invalid.
    fn next_request(&mut self) -> Option<IntegrationRequest>;
}

/// Reads whitespace-separated four-field records from a buffered reader.
///
/// Records may span line breaks; tokens are consumed four at a time.
pub struct TextRequestSource<R> {
    reader: R,
    tokens: VecDeque<String>,
    prompt: bool,
    finished: bool,
    line: String,
}

impl<R: BufRead + Send> TextRequestSource<R> {
    pub fn new(reader: R) -> Self {
        TextRequestSource {
            reader,
            tokens: VecDeque::new(),
            prompt: false,
            finished: false,
            line: String::new(),
        }
    }

    /// Print the query prompt on stdout before each record.
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    fn fill_tokens(&mut self, wanted: usize) -> bool {
        while self.tokens.len() < wanted {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return false,
                Ok(_) => self
                    .tokens
                    .extend(self.line.split_whitespace().map(str::to_string)),
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    return false;
                }
            }
        }
        true
    }
}

impl<R: BufRead + Send> RequestSource for TextRequestSource<R> {
    fn next_request(&mut self) -> Option<IntegrationRequest> {
        if self.finished {
            return None;
        }
        if self.prompt {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{PROMPT}");
            let _ = out.flush();
        }
        if !self.fill_tokens(4) {
            debug!(leftover = self.tokens.len(), "end of input");
            self.finished = true;
            return None;
        }
        let mut take = || self.tokens.pop_front().unwrap_or_default();
        let (start, end, steps, func) = (take(), take(), take(), take());
        match parse_fields(&start, &end, &steps, &func) {
            Ok(request) => Some(request),
            Err(e) => {
                debug!(error = %e, "rejected record, treating as end of input");
                self.finished = true;
                None
            }
        }
    }
}

/// Source over requests that are already built.
pub struct IterRequestSource<I> {
    inner: I,
}

impl<I> IterRequestSource<I>
where
    I: Iterator<Item = IntegrationRequest> + Send,
{
    pub fn new(inner: impl IntoIterator<IntoIter = I>) -> Self {
        IterRequestSource {
            inner: inner.into_iter(),
        }
    }
}

impl<I> RequestSource for IterRequestSource<I>
where
    I: Iterator<Item = IntegrationRequest> + Send,
{
    fn next_request(&mut self) -> Option<IntegrationRequest> {
        self.inner.next()
    }
}
