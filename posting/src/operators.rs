use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::context::Context;
use crate::error::BoxError;

/// The three bracket operators `@(...)`, `@[...]` and `@{...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bracket {
    Round,
    Square,
    Curly,
}

impl Bracket {
    /// In the order the scanner tries them.
    pub const ALL: [Bracket; 3] = [Bracket::Round, Bracket::Square, Bracket::Curly];

    pub fn open(self) -> char {
        match self {
            Bracket::Round => '(',
            Bracket::Square => '[',
            Bracket::Curly => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Round => ')',
            Bracket::Square => ']',
            Bracket::Curly => '}',
        }
    }

    /// Backslash escapes of this bracket kind; never taken as the close.
    pub fn escapes(self) -> [&'static str; 2] {
        match self {
            Bracket::Round => ["\\(", "\\)"],
            Bracket::Square => ["\\[", "\\]"],
            Bracket::Curly => ["\\{", "\\}"],
        }
    }
}

/// Handler for one bracket kind, given the span between the brackets.
pub type OperatorFn = Arc<dyn Fn(&mut Context<'_>, Range<usize>) -> Result<String, BoxError> + Send + Sync>;

/// The operator table. Every kind defaults to [`unescape`].
#[derive(Clone)]
pub struct Operators {
    round: OperatorFn,
    square: OperatorFn,
    curly: OperatorFn,
}

impl Default for Operators {
    fn default() -> Self {
        Operators {
            round: default_operator(Bracket::Round),
            square: default_operator(Bracket::Square),
            curly: default_operator(Bracket::Curly),
        }
    }
}

impl fmt::Debug for Operators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operators { .. }")
    }
}

impl Operators {
    pub fn get(&self, bracket: Bracket) -> &OperatorFn {
        match bracket {
            Bracket::Round => &self.round,
            Bracket::Square => &self.square,
            Bracket::Curly => &self.curly,
        }
    }

    pub fn set(
        &mut self,
        bracket: Bracket,
        handler: impl Fn(&mut Context<'_>, Range<usize>) -> Result<String, BoxError> + Send + Sync + 'static,
    ) {
        let slot = match bracket {
            Bracket::Round => &mut self.round,
            Bracket::Square => &mut self.square,
            Bracket::Curly => &mut self.curly,
        };
        *slot = operator(handler);
    }
}

/// Wrap a closure as an [`OperatorFn`].
pub fn operator(
    handler: impl Fn(&mut Context<'_>, Range<usize>) -> Result<String, BoxError> + Send + Sync + 'static,
) -> OperatorFn {
    Arc::new(handler)
}

fn default_operator(bracket: Bracket) -> OperatorFn {
    operator(move |ctx, span| Ok(unescape(ctx.text(span), bracket)))
}

/// Remove the backslash from escaped brackets of `bracket`'s kind.
pub fn unescape(text: &str, bracket: Bracket) -> String {
    let [open, close] = bracket.escapes();
    text.replace(open, &open[1..]).replace(close, &close[1..])
}
