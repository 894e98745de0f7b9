//! SQL fragment rewriting.
//!
//! User-supplied fragments (join conditions, condition templates, projection
//! expressions) are scanned once. Alias-qualified identifiers
//! (`join_1.inv_id`) become dialect-quoted references, `?` becomes the
//! dialect's placeholder, and string literals and quoted identifiers are
//! copied verbatim.

use super::expr::parse_column;
use crate::dialect::{Dialect, PlaceholderStyle, placeholder_name, render_placeholder};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Collects bind values in statement order and hands out placeholders.
#[derive(Debug)]
pub(crate) struct ParamSink {
    style: PlaceholderStyle,
    params: Vec<Value>,
    names: Vec<String>,
}

impl ParamSink {
    pub(crate) fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            params: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Bind `value` and return its placeholder text.
    pub(crate) fn push(&mut self, value: Value) -> String {
        self.params.push(value);
        let index = self.params.len();
        if self.style == PlaceholderStyle::Named {
            self.names.push(placeholder_name(index));
        }
        render_placeholder(self.style, index)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn finish(self) -> (Vec<Value>, Vec<String>) {
        (self.params, self.names)
    }
}

/// Qualifiers of column references in `sql` (`q.col`, `q.*`) that are not in
/// `aliases`. A qualified function call such as `public.f(x)` is not a column
/// reference.
pub(crate) fn unknown_qualifiers<'s>(sql: &'s str, aliases: &[&str]) -> Vec<&'s str> {
    let mut unknown = Vec::new();
    let mut pending: Option<&'s str> = None;
    scan(sql, |token| {
        if let Some(q) = pending.take() {
            if !matches!(token, Token::Verbatim("(")) {
                unknown.push(q);
            }
        }
        if let Token::Word {
            qualifier: Some(q),
            name,
        } = token
        {
            if !aliases.contains(&q) {
                if name == "*" {
                    unknown.push(q);
                } else {
                    pending = Some(q);
                }
            }
        }
    });
    unknown.extend(pending);
    unknown
}

/// Count `?` placeholders outside string literals and quoted identifiers.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |token| {
        if matches!(token, Token::Placeholder) {
            count += 1;
        }
    });
    count
}

/// Rewrites fragments against a fixed set of known aliases.
pub(crate) struct Fragment<'a> {
    dialect: &'a dyn Dialect,
    aliases: &'a [&'a str],
}

impl<'a> Fragment<'a> {
    pub(crate) fn new(dialect: &'a dyn Dialect, aliases: &'a [&'a str]) -> Self {
        Self { dialect, aliases }
    }

    /// Quoted reference for a condition column (`col` or `alias.col`).
    pub(crate) fn column(&self, column: &str) -> OrmResult<String> {
        Ok(parse_column(column, self.aliases)?.to_sql(self.dialect))
    }

    /// Rewrite `sql`, binding `params` to its `?` placeholders in order.
    pub(crate) fn render(
        &self,
        sql: &str,
        params: &[Value],
        sink: &mut ParamSink,
    ) -> OrmResult<String> {
        let expected = count_placeholders(sql);
        if expected != params.len() {
            return Err(OrmError::condition(format!(
                "'{sql}' has {expected} placeholder(s) but {} parameter(s) were given",
                params.len()
            )));
        }

        let mut out = String::with_capacity(sql.len() + 8);
        let mut params = params.iter().cloned();
        scan(sql, |token| match token {
            Token::Verbatim(text) => out.push_str(text),
            Token::Word { qualifier, name } => match qualifier {
                Some(q) if self.aliases.contains(&q) => {
                    out.push_str(&self.dialect.quote_identifier(q));
                    out.push('.');
                    if name == "*" {
                        out.push('*');
                    } else {
                        out.push_str(&self.dialect.quote_identifier(name));
                    }
                }
                Some(q) => {
                    out.push_str(q);
                    out.push('.');
                    out.push_str(name);
                }
                None => out.push_str(name),
            },
            Token::Placeholder => {
                if let Some(value) = params.next() {
                    out.push_str(&sink.push(value));
                }
            }
        });
        Ok(out)
    }
}

enum Token<'s> {
    Verbatim(&'s str),
    Word {
        qualifier: Option<&'s str>,
        name: &'s str,
    },
    Placeholder,
}

fn is_word_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_word_char(b: u8) -> bool {
    b == b'_' || b == b'$' || b.is_ascii_alphanumeric()
}

/// Split `sql` into tokens. Only ASCII bytes are ever split on, so every
/// slice boundary falls on a char boundary.
fn scan<'s>(sql: &'s str, mut emit: impl FnMut(Token<'s>)) {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' | b'"' | b'`' => {
                let end = quoted_end(bytes, i, b);
                emit(Token::Verbatim(&sql[i..end]));
                i = end;
            }
            b'?' => {
                emit(Token::Placeholder);
                i += 1;
            }
            _ if is_word_start(b) => {
                let start = i;
                while i < bytes.len() && is_word_char(bytes[i]) {
                    i += 1;
                }
                let first = &sql[start..i];
                if i + 1 < bytes.len() && bytes[i] == b'.' {
                    let next = bytes[i + 1];
                    if is_word_start(next) {
                        let name_start = i + 1;
                        let mut j = name_start;
                        while j < bytes.len() && is_word_char(bytes[j]) {
                            j += 1;
                        }
                        emit(Token::Word {
                            qualifier: Some(first),
                            name: &sql[name_start..j],
                        });
                        i = j;
                        continue;
                    }
                    if next == b'*' {
                        emit(Token::Word {
                            qualifier: Some(first),
                            name: "*",
                        });
                        i += 2;
                        continue;
                    }
                }
                emit(Token::Word {
                    qualifier: None,
                    name: first,
                });
            }
            _ if b.is_ascii_digit() => {
                let start = i;
                while i < bytes.len() && (is_word_char(bytes[i]) || bytes[i] == b'.') {
                    i += 1;
                }
                emit(Token::Verbatim(&sql[start..i]));
            }
            _ => {
                let start = i;
                i += 1;
                while i < bytes.len() && !bytes[i].is_ascii() {
                    i += 1;
                }
                emit(Token::Verbatim(&sql[start..i]));
            }
        }
    }
}

/// End (exclusive) of a quoted run starting at `start`. Doubled quotes are
/// escapes. An unterminated run extends to the end of input.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if i + 1 < bytes.len() && bytes[i + 1] == quote {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}
