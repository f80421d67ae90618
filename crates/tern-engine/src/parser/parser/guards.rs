//! Parser guards against runaway recursion.

use super::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// Run a recursive production one nesting level deeper.
    ///
    /// Deeply nested input is rejected with a syntax error instead of
    /// overflowing the native stack.
    pub(super) fn nested<T>(
        &mut self,
        production: impl FnOnce(&mut Parser<'a>) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::parser_limit_exceeded(
                format!("nesting deeper than {} levels", self.max_depth),
                self.current_span(),
            ));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }
}
