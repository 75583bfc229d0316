//! Import extraction from JavaScript and TypeScript sources.
//!
//! Only statically visible specifiers are collected:
//!
//! ```text
//! require("x")                  // single string literal argument
//! import a from "x"             // value imports, `import type` skipped
//! export { a } from "x"
//! export * from "x"
//! import("x")                   // literal argument only
//! ```
//!
//! Computed specifiers (`require(name)`, template strings) are ignored.

use std::path::{Path, PathBuf};

use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression,
};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::{ParseOptions, Parser};
use oxc::span::SourceType;
use thiserror::Error;

use super::specifier::is_data_file;

/// A file that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}:{line}:{column}: {message}", path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Raw specifiers of `source`, in source order, duplicates included.
///
/// Specifiers naming data files (`.json`, `.node`) are dropped.
pub fn extract_imports(path: &Path, source: &str) -> Result<Vec<String>, ParseError> {
    let source = blank_hashbang(source);
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::cjs());

    let ret = Parser::new(&allocator, &source, source_type)
        .with_options(ParseOptions {
            allow_return_outside_function: true,
            ..ParseOptions::default()
        })
        .parse();

    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, |label| label.offset());
        let (line, column) = line_column(&source, offset);
        return Err(ParseError {
            path: path.to_path_buf(),
            line,
            column,
            message: err.to_string(),
        });
    }

    let mut collector = ImportCollector::default();
    collector.visit_program(&ret.program);
    collector.specifiers.retain(|spec| !is_data_file(spec));
    Ok(collector.specifiers)
}

#[derive(Default)]
struct ImportCollector {
    specifiers: Vec<String>,
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee
            && callee.name == "require"
            && it.arguments.len() == 1
            && let Argument::StringLiteral(lit) = &it.arguments[0]
        {
            self.specifiers.push(lit.value.to_string());
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        if !it.import_kind.is_type() {
            self.specifiers.push(it.source.value.to_string());
        }
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source
            && !it.export_kind.is_type()
        {
            self.specifiers.push(source.value.to_string());
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        if !it.export_kind.is_type() {
            self.specifiers.push(it.source.value.to_string());
        }
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Expression::StringLiteral(lit) = &it.source {
            self.specifiers.push(lit.value.to_string());
        }
        walk::walk_import_expression(self, it);
    }
}

/// Replace a leading `#!` line with spaces, keeping its newline.
fn blank_hashbang(source: &str) -> std::borrow::Cow<'_, str> {
    if !source.starts_with("#!") {
        return source.into();
    }
    let end = source.find('\n').unwrap_or(source.len());
    let mut out = " ".repeat(end);
    out.push_str(&source[end..]);
    out.into()
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
