//! Dialect-specific row windowing.
//!
//! Operator templates are plain `SELECT` statements. To return one page,
//! the statement is rewritten once, right before execution, with the
//! windowing syntax of the configured [`Rdbms`]. Result column names are
//! left alone, except for the jTDS wrapper, which adds the reserved
//! [`ROW_NUMBER_COLUMN`]; the executor drops that column from mapped rows.
//!
//! The rewrite needs to know a little about the statement (is there a
//! top-level `ORDER BY` or `TOP`, does it open with common table
//! expressions, where does the `SELECT` list start, how many `?` markers
//! does it bind). [`SqlScanner`] answers those questions while skipping
//! string literals, quoted identifiers, comments and parenthesized
//! subqueries.
//!
//! SQL Server needs care in two places. `TOP` cannot share a `SELECT` with
//! `OFFSET`, so a base with its own `TOP` is paged from a derived table.
//! A `WITH` clause cannot sit inside a derived table, so its CTE list is
//! hoisted in front of the wrapper.

use crate::dialect::{PagingStrategy, PlaceholderStyle, Rdbms};

/// Column added by the row-number wrapper.
pub const ROW_NUMBER_COLUMN: &str = "__row_nr__";

/// One page of a result set: rows `[offset, offset + limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pageable {
    offset: usize,
    limit: usize,
}

impl Pageable {
    /// Creates a page request. Returns `None` for an empty page.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Option<Self> {
        if limit == 0 {
            None
        } else {
            Some(Self { offset, limit })
        }
    }

    /// Builds a page request from the host's `first`/`max` arguments.
    ///
    /// No `max` (or a zero `max`) means every row; `first` defaults to 0.
    #[must_use]
    pub fn from_range(first: Option<usize>, max: Option<usize>) -> Option<Self> {
        max.and_then(|limit| Self::new(first.unwrap_or(0), limit))
    }

    /// Number of rows skipped.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Maximum number of rows returned.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Index one past the last row of the page.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Rewrites `query` to return only the rows selected by `pageable`.
#[must_use]
pub fn format_with_pageable(query: &str, pageable: &Pageable, rdbms: Rdbms) -> String {
    let scanner = SqlScanner::new(query);
    let base = scanner.statement();
    let (offset, limit, end) = (pageable.offset(), pageable.limit(), pageable.end());

    match rdbms.paging_strategy() {
        PagingStrategy::LimitOffset => format!("{base} LIMIT {limit} OFFSET {offset}"),
        PagingStrategy::LimitComma => format!("{base} LIMIT {offset}, {limit}"),
        PagingStrategy::OffsetFetch => {
            format!("{base} OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
        }
        PagingStrategy::OffsetFetchOrdered => {
            let window = format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY");
            if scanner.has_top_level_top() {
                let (ctes, main) = scanner.split_ctes(&base);
                format!("{ctes}SELECT * FROM ({main}) paged_ ORDER BY (SELECT NULL) {window}")
            } else if scanner.has_top_level_order_by() {
                format!("{base} {window}")
            } else {
                format!("{base} ORDER BY (SELECT NULL) {window}")
            }
        }
        PagingStrategy::RowNumber => {
            let (ctes, main) = scanner.split_ctes(&base);
            let main_scanner = SqlScanner::new(main);
            // SQL Server rejects ORDER BY in a derived table unless TOP is present.
            let inner = match main_scanner.select_list_start() {
                Some(at)
                    if main_scanner.has_top_level_order_by() && !main_scanner.has_top_level_top() =>
                {
                    format!("{} TOP({end}) {}", &main[..at], main[at..].trim_start())
                }
                _ => main.to_string(),
            };
            let with = if ctes.is_empty() {
                "WITH".to_string()
            } else {
                format!("{},", ctes.trim_end())
            };
            format!(
                "{with} query_ AS (SELECT inner_query_.*, ROW_NUMBER() OVER (ORDER BY CURRENT_TIMESTAMP) AS {ROW_NUMBER_COLUMN} FROM ({inner}) inner_query_) \
                 SELECT * FROM query_ WHERE {ROW_NUMBER_COLUMN} > {offset} AND {ROW_NUMBER_COLUMN} <= {end} ORDER BY {ROW_NUMBER_COLUMN}"
            )
        }
    }
}

/// Counts the `?` bind markers in a statement.
#[must_use]
pub fn count_placeholders(query: &str) -> usize {
    SqlScanner::new(query).placeholders.len()
}

/// Rewrites `?` markers into the placeholder style of `rdbms`.
#[must_use]
pub fn bind_markers(query: &str, rdbms: Rdbms) -> String {
    match rdbms.placeholder_style() {
        PlaceholderStyle::Question => query.to_string(),
        PlaceholderStyle::Numbered => {
            let scanner = SqlScanner::new(query);
            let mut out = String::with_capacity(query.len() + scanner.placeholders.len() * 2);
            let mut last = 0;
            for (n, &at) in scanner.placeholders.iter().enumerate() {
                out.push_str(&query[last..at]);
                out.push('$');
                out.push_str(&(n + 1).to_string());
                last = at + 1;
            }
            out.push_str(&query[last..]);
            out
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    Backticked,
    LineComment,
    BlockComment,
}

/// Lexical view of a statement.
///
/// Works on bytes: every byte of a multi-byte UTF-8 character is >= 0x80,
/// so it can never be mistaken for SQL punctuation.
#[derive(Debug)]
pub struct SqlScanner<'a> {
    sql: &'a str,
    /// Uppercased top-level code; literals, comments and nested parentheses blanked.
    mask: Vec<u8>,
    placeholders: Vec<usize>,
    ends_in_line_comment: bool,
}

impl<'a> SqlScanner<'a> {
    /// Scans a statement.
    #[must_use]
    pub fn new(sql: &'a str) -> Self {
        let bytes = sql.as_bytes();
        let mut mask = vec![b' '; bytes.len()];
        let mut placeholders = Vec::new();
        let mut state = State::Code;
        let mut depth = 0usize;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();
            match state {
                State::Code => match b {
                    b'\'' => state = State::SingleQuoted,
                    b'"' => state = State::DoubleQuoted,
                    b'[' => state = State::Bracketed,
                    b'`' => state = State::Backticked,
                    b'-' if next == Some(b'-') => {
                        state = State::LineComment;
                        i += 1;
                    }
                    b'/' if next == Some(b'*') => {
                        state = State::BlockComment;
                        i += 1;
                    }
                    b'(' => depth += 1,
                    b')' => depth = depth.saturating_sub(1),
                    b'?' => placeholders.push(i),
                    _ if depth == 0 => mask[i] = b.to_ascii_uppercase(),
                    _ => {}
                },
                State::SingleQuoted => {
                    if b == b'\'' {
                        if next == Some(b'\'') {
                            i += 1;
                        } else {
                            state = State::Code;
                        }
                    }
                }
                State::DoubleQuoted => {
                    if b == b'"' {
                        state = State::Code;
                    }
                }
                State::Bracketed => {
                    if b == b']' {
                        state = State::Code;
                    }
                }
                State::Backticked => {
                    if b == b'`' {
                        state = State::Code;
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Code;
                    }
                }
                State::BlockComment => {
                    if b == b'*' && next == Some(b'/') {
                        state = State::Code;
                        i += 1;
                    }
                }
            }
            i += 1;
        }

        Self {
            sql,
            mask,
            placeholders,
            ends_in_line_comment: state == State::LineComment,
        }
    }

    /// Returns the statement without trailing semicolons and whitespace,
    /// ready to have clauses appended.
    #[must_use]
    pub fn statement(&self) -> String {
        let mut end = self.sql.len();
        let bytes = self.sql.as_bytes();
        while end > 0 && (bytes[end - 1].is_ascii_whitespace() || bytes[end - 1] == b';') {
            // Only strip semicolons and whitespace that are real code.
            if bytes[end - 1] == b';' && self.mask[end - 1] != b';' {
                break;
            }
            end -= 1;
        }
        let mut statement = self.sql[..end].to_string();
        if self.ends_in_line_comment {
            statement.push('\n');
        }
        statement
    }

    /// Returns true if the statement has an `ORDER BY` outside any subquery.
    #[must_use]
    pub fn has_top_level_order_by(&self) -> bool {
        let mut from = 0;
        while let Some(at) = self.find_keyword("ORDER", from) {
            let after = self.skip_whitespace(at + "ORDER".len());
            if self.keyword_at(after, "BY") {
                return true;
            }
            from = at + 1;
        }
        false
    }

    /// Returns the byte offset where the top-level select list begins,
    /// after `SELECT` and an optional `DISTINCT`.
    #[must_use]
    pub fn select_list_start(&self) -> Option<usize> {
        let select = self.find_keyword("SELECT", 0)?;
        let mut at = select + "SELECT".len();
        let after = self.skip_whitespace(at);
        if self.keyword_at(after, "DISTINCT") {
            at = after + "DISTINCT".len();
        }
        Some(at)
    }

    /// Returns true if the top-level select list opens with `TOP`.
    #[must_use]
    pub fn has_top_level_top(&self) -> bool {
        self.select_list_start()
            .is_some_and(|at| self.keyword_at(self.skip_whitespace(at), "TOP"))
    }

    /// Returns the byte offset of the main `SELECT` when the statement opens
    /// with a `WITH` clause.
    #[must_use]
    pub fn cte_end(&self) -> Option<usize> {
        if self.keyword_at(self.skip_whitespace(0), "WITH") {
            self.find_keyword("SELECT", 0)
        } else {
            None
        }
    }

    /// Splits `statement` (as returned by [`Self::statement`]) into its CTE
    /// prefix, empty when there is none, and the main query.
    #[must_use]
    pub fn split_ctes<'s>(&self, statement: &'s str) -> (&'s str, &'s str) {
        match self.cte_end() {
            Some(at) if at <= statement.len() => statement.split_at(at),
            _ => ("", statement),
        }
    }

    fn find_keyword(&self, keyword: &str, from: usize) -> Option<usize> {
        (from..self.mask.len()).find(|&at| self.keyword_at(at, keyword))
    }

    fn keyword_at(&self, at: usize, keyword: &str) -> bool {
        let end = at + keyword.len();
        end <= self.mask.len()
            && &self.mask[at..end] == keyword.as_bytes()
            && (at == 0 || !is_word_byte(self.mask[at - 1]))
            && (end == self.mask.len() || !is_word_byte(self.mask[end]))
    }

    fn skip_whitespace(&self, mut at: usize) -> usize {
        while at < self.mask.len() && self.mask[at].is_ascii_whitespace() {
            at += 1;
        }
        at
    }
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
