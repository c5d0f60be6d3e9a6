//! Document traits
//!
//! Seams between the page pipeline and its collaborators: the rasterization
//! backend and the password prompt supplied by the display shell.

use super::error::RenderError;
use super::types::{Bitmap, PageSize};

/// Source of raster pages
///
/// Implementations must be deterministic: rendering the same `(index, scale)`
/// twice yields bit-identical bitmaps.
pub trait PageRasterizer {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Intrinsic size of a page in points
    fn page_size(&self, index: usize) -> Result<PageSize, RenderError>;

    /// Render a single page at `scale`
    fn render_page(&self, index: usize, scale: f32) -> Result<Bitmap, RenderError>;

    fn check_index(&self, index: usize) -> Result<(), RenderError> {
        let page_count = self.page_count();
        if index >= page_count {
            return Err(RenderError::OutOfRange { index, page_count });
        }
        Ok(())
    }
}

/// Synchronous credential request issued while opening a protected PDF
///
/// Returning `None` (or an empty string) cancels the load.
pub trait PasswordPrompt {
    /// `attempt` starts at 1 and increases after every rejected password
    fn request_password(&mut self, attempt: u32) -> Option<String>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(u32) -> Option<String>,
{
    fn request_password(&mut self, attempt: u32) -> Option<String> {
        self(attempt)
    }
}

/// Prompt that always cancels; used for documents known to be unprotected
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn request_password(&mut self, _attempt: u32) -> Option<String> {
        None
    }
}

/// Prompt that replays a fixed list of answers, then cancels
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    answers: Vec<String>,
    asked: usize,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// How many times the prompt was consulted
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn request_password(&mut self, _attempt: u32) -> Option<String> {
        let answer = self.answers.get(self.asked).cloned();
        self.asked += 1;
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_prompt() {
        let mut prompt = |attempt: u32| Some(format!("pw{}", attempt));
        assert_eq!(prompt.request_password(2), Some("pw2".to_string()));
    }

    #[test]
    fn test_scripted_prompt_runs_out() {
        let mut prompt = ScriptedPrompt::new(["a", "b"]);
        assert_eq!(prompt.request_password(1).as_deref(), Some("a"));
        assert_eq!(prompt.request_password(2).as_deref(), Some("b"));
        assert_eq!(prompt.request_password(3), None);
        assert_eq!(prompt.asked(), 3);
    }

    #[test]
    fn test_no_prompt_cancels() {
        assert_eq!(NoPrompt.request_password(1), None);
    }
}
