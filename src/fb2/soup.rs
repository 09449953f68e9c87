//! Last-resort tag-soup parse.
//!
//! Runs the html5ever tokenizer without its HTML tree-construction rules and
//! builds the tree with XML semantics: every start tag opens an element,
//! `/>` closes it immediately, an end tag closes the nearest open element of
//! that name, and whatever is still open at the end is closed. Nesting is
//! capped at [`MAX_DEPTH`]: past it, the innermost element is closed before
//! the next one opens. Character references are decoded; a bare `&` stays
//! literal. Never fails on syntax.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::TokenizerResult;

use super::dom::{MAX_DEPTH, TreeBuilder, XmlElement};

/// Collects tokens into a [`TreeBuilder`].
///
/// `TokenSink` takes `&self`, so the builder lives in a `RefCell`.
#[derive(Default)]
struct SoupSink {
    builder: RefCell<TreeBuilder>,
}

impl TokenSink for SoupSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let mut builder = self.builder.borrow_mut();
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => {
                    let attrs = tag
                        .attrs
                        .iter()
                        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                        .collect();
                    builder.open_bounded(tag.name.to_string(), attrs);
                    if tag.self_closing {
                        builder.close();
                    }
                }
                TagKind::EndTag => {
                    builder.close_named(&tag.name);
                }
            },
            Token::CharacterTokens(text) => builder.text(&text),
            // Comments, doctypes, the XML declaration (a bogus comment to
            // this tokenizer), NULs and parse errors carry nothing we keep.
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Build a tree from arbitrary markup. `None` only when no element was seen.
pub(crate) fn parse(text: &str) -> Option<XmlElement> {
    let tokenizer = Tokenizer::new(SoupSink::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from(text));
    match tokenizer.feed(&input) {
        TokenizerResult::Done => {}
        // Only a sink asking for script handling (or reporting an encoding)
        // pauses the tokenizer, and this one never does.
        TokenizerResult::Script(_) | TokenizerResult::EncodingIndicator(_) => return None,
    }
    tokenizer.end();
    tokenizer.sink.builder.into_inner().finish_lenient()
}
