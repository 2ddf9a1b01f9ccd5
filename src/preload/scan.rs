//! Import specifier scanner.
//!
//! Walks JavaScript module source and collects the specifiers of static
//! imports, re-exports and string-literal dynamic imports. It is a tokenizer,
//! not a parser: comments, string literals, template literals and (by the
//! usual previous-token heuristic) regular expression literals are skipped so
//! import-like text inside them is never reported.

use super::error::ScanError;

/// How a module was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import ... from "x"`, `import "x"`, `export ... from "x"`
    Static,
    /// `import("x")`
    Dynamic,
}

/// Import specifier found in module source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Specifier exactly as written between the quotes.
    pub specifier: String,
    pub kind: ImportKind,
    /// Line of the specifier (1-indexed).
    pub line: u32,
}

/// Scan module source for import specifiers.
///
/// Returns imports in first-appearance order, deduplicated by specifier. A
/// specifier imported both statically and dynamically is reported as static.
/// Unterminated strings, templates and block comments are scan errors.
pub fn scan_imports(source: &str) -> Result<Vec<Import>, ScanError> {
    let mut scanner = Scanner::new(source);
    let mut imports: Vec<Import> = Vec::new();

    while let Some(found) = scanner.next_import()? {
        match imports.iter_mut().find(|i| i.specifier == found.specifier) {
            Some(existing) => {
                if found.kind == ImportKind::Static {
                    existing.kind = ImportKind::Static;
                }
            }
            None => imports.push(found),
        }
    }

    Ok(imports)
}

/// Marker stored in `last` after an identifier, or a keyword that can end an
/// expression (`this`, `null`, ...).
const IDENT: u8 = b'a';
/// Marker stored in `last` after a keyword that is followed by an expression,
/// where a `/` starts a regex.
const KEYWORD: u8 = b'k';
/// Marker stored in `last` after a string, template or regex literal.
const LITERAL: u8 = b'"';

/// Upper bound on tokens inspected between `import`/`export` and `from`.
const MAX_CLAUSE_TOKENS: usize = 256;

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    /// Last significant token, used to tell `/` division from a regex and
    /// `obj.import` from the `import` keyword.
    last: Option<u8>,
}

impl<'a> Scanner<'a> {
    const fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            last: None,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if let Some(b) = self.peek() {
            if b == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    /// Advance to the next import, or `None` at end of input.
    fn next_import(&mut self) -> Result<Option<Import>, ScanError> {
        while let Some(b) = self.peek() {
            match b {
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                b'/' if self.regex_allowed() => {
                    self.skip_regex();
                    self.last = Some(LITERAL);
                }
                b'\'' | b'"' => {
                    self.read_string()?;
                    self.last = Some(LITERAL);
                }
                b'`' => {
                    self.skip_template()?;
                    self.last = Some(LITERAL);
                }
                _ if is_ident_start(b) => {
                    let after_dot = self.last == Some(b'.');
                    let word = self.read_word();
                    self.last = if !after_dot && precedes_expression(word) {
                        Some(KEYWORD)
                    } else {
                        Some(IDENT)
                    };
                    if after_dot {
                        continue;
                    }
                    let found = match word {
                        "import" => self.import_after_keyword()?,
                        "export" => self.export_after_keyword()?,
                        _ => None,
                    };
                    if found.is_some() {
                        return Ok(found);
                    }
                }
                _ if b.is_ascii_whitespace() => self.bump(),
                _ => {
                    self.last = Some(b);
                    self.bump();
                }
            }
        }
        Ok(None)
    }

    fn import_after_keyword(&mut self) -> Result<Option<Import>, ScanError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'(') => {
                self.bump();
                self.last = Some(b'(');
                self.skip_trivia()?;
                let line = self.line;
                let specifier = match self.peek() {
                    Some(b'\'' | b'"') => self.read_string()?,
                    Some(b'`') => match self.read_plain_template()? {
                        Some(s) => s,
                        None => return Ok(None),
                    },
                    _ => return Ok(None),
                };
                self.last = Some(LITERAL);
                Ok(Some(Import {
                    specifier,
                    kind: ImportKind::Dynamic,
                    line,
                }))
            }
            // import.meta
            Some(b'.') => Ok(None),
            Some(b'\'' | b'"') => self.static_specifier(),
            _ => self.clause_then_specifier(),
        }
    }

    fn export_after_keyword(&mut self) -> Result<Option<Import>, ScanError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'*' | b'{') => self.clause_then_specifier(),
            _ => Ok(None),
        }
    }

    /// Walk an import/export clause up to `from` and read the specifier.
    fn clause_then_specifier(&mut self) -> Result<Option<Import>, ScanError> {
        for _ in 0..MAX_CLAUSE_TOKENS {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'{') => self.skip_braced_names()?,
                Some(b'*' | b',') => self.bump(),
                Some(b) if is_ident_start(b) => {
                    let word = self.read_word();
                    self.last = Some(IDENT);
                    if word == "from" {
                        self.skip_trivia()?;
                        return match self.peek() {
                            Some(b'\'' | b'"') => self.static_specifier(),
                            _ => Ok(None),
                        };
                    }
                }
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    fn static_specifier(&mut self) -> Result<Option<Import>, ScanError> {
        let line = self.line;
        let specifier = self.read_string()?;
        self.last = Some(LITERAL);
        Ok(Some(Import {
            specifier,
            kind: ImportKind::Static,
            line,
        }))
    }

    /// Skip `{ a, b as c, "d-e" as f }`.
    fn skip_braced_names(&mut self) -> Result<(), ScanError> {
        let start_line = self.line;
        self.bump();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(b'}') => {
                    self.bump();
                    self.last = Some(b'}');
                    return Ok(());
                }
                Some(b'\'' | b'"') => {
                    self.read_string()?;
                }
                Some(_) => self.bump(),
                None => return Err(ScanError::new(start_line, "unterminated import clause")),
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.bump(),
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                return;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start_line = self.line;
        self.bump();
        self.bump();
        while let Some(b) = self.peek() {
            if b == b'*' && self.peek_at(1) == Some(b'/') {
                self.bump();
                self.bump();
                return Ok(());
            }
            self.bump();
        }
        Err(ScanError::new(start_line, "unterminated block comment"))
    }

    /// Read a quoted string starting at the opening quote and return its raw
    /// contents. Escapes are kept verbatim.
    fn read_string(&mut self) -> Result<String, ScanError> {
        let start_line = self.line;
        let Some(quote) = self.peek() else {
            return Err(ScanError::new(start_line, "expected string literal"));
        };
        self.bump();
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'\n' => break,
                _ if b == quote => {
                    let value = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                    self.bump();
                    return Ok(value);
                }
                _ => self.bump(),
            }
        }
        Err(ScanError::new(start_line, "unterminated string literal"))
    }

    /// Read a template literal without substitutions. Returns `None` (and
    /// skips the whole template) when it contains `${`.
    fn read_plain_template(&mut self) -> Result<Option<String>, ScanError> {
        let start = self.pos + 1;
        let end = self.skip_template()?;
        let body = &self.src[start..end];
        if body.windows(2).any(|w| w == b"${") {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(body).into_owned()))
    }

    /// Skip a template literal, including nested code in `${}`. Returns the
    /// index of the closing backtick.
    fn skip_template(&mut self) -> Result<usize, ScanError> {
        let start_line = self.line;
        self.bump();
        while let Some(b) = self.peek() {
            match b {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'`' => {
                    let end = self.pos;
                    self.bump();
                    return Ok(end);
                }
                b'$' if self.peek_at(1) == Some(b'{') => {
                    self.bump();
                    self.bump();
                    self.skip_substitution()?;
                }
                _ => self.bump(),
            }
        }
        Err(ScanError::new(start_line, "unterminated template literal"))
    }

    /// Skip the code inside `${ ... }` up to and including the closing brace.
    fn skip_substitution(&mut self) -> Result<(), ScanError> {
        let start_line = self.line;
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            match b {
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                b'\'' | b'"' => {
                    self.read_string()?;
                }
                b'`' => {
                    self.skip_template()?;
                }
                b'{' => {
                    depth += 1;
                    self.bump();
                }
                b'}' => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => self.bump(),
            }
        }
        Err(ScanError::new(start_line, "unterminated template substitution"))
    }

    fn regex_allowed(&self) -> bool {
        match self.last {
            None => true,
            Some(b) => b == KEYWORD || b"(,=:[!&|?{};+-*%<>~^".contains(&b),
        }
    }

    /// Skip a regular expression literal and its flags. A regex that runs to
    /// end of line is left for the main loop to continue from.
    fn skip_regex(&mut self) {
        self.bump();
        let mut in_class = false;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'\n' => return,
                b'[' => {
                    in_class = true;
                    self.bump();
                }
                b']' => {
                    in_class = false;
                    self.bump();
                }
                b'/' if !in_class => {
                    self.bump();
                    while self.peek().is_some_and(is_ident_part) {
                        self.bump();
                    }
                    return;
                }
                _ => self.bump(),
            }
        }
    }

    fn read_word(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        std::str::from_utf8(&src[start..self.pos]).unwrap_or("")
    }
}

/// Keywords after which an expression, and so a regex literal, may begin.
fn precedes_expression(word: &str) -> bool {
    matches!(
        word,
        "return"
            | "typeof"
            | "instanceof"
            | "in"
            | "of"
            | "new"
            | "delete"
            | "void"
            | "throw"
            | "case"
            | "do"
            | "else"
            | "yield"
            | "await"
            | "default"
    )
}

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

const fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(source: &str) -> Vec<String> {
        scan_imports(source)
            .unwrap()
            .into_iter()
            .map(|i| i.specifier)
            .collect()
    }

    #[test]
    fn test_static_import_forms() {
        let source = r#"
import a from "./a.js";
import { b, c as d } from './b.js';
import * as ns from "./ns.js";
import def, { e } from "./e.js";
import "./side-effect.js";
"#;
        assert_eq!(
            specifiers(source),
            vec!["./a.js", "./b.js", "./ns.js", "./e.js", "./side-effect.js"]
        );
    }

    #[test]
    fn test_export_from() {
        let source = r#"
export * from "./all.js";
export { x, y as z } from "./some.js";
export * as grouped from "./grouped.js";
export { local };
export const value = 1;
"#;
        assert_eq!(
            specifiers(source),
            vec!["./all.js", "./some.js", "./grouped.js"]
        );
    }

    #[test]
    fn test_dynamic_import() {
        let imports = scan_imports("const m = await import('./lazy.js');").unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./lazy.js");
        assert_eq!(imports[0].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_dynamic_import_non_literal_ignored() {
        assert!(specifiers("import(name); import(`./${name}.js`);").is_empty());
        assert_eq!(specifiers("import(`./plain.js`);"), vec!["./plain.js"]);
    }

    #[test]
    fn test_import_meta_ignored() {
        assert!(specifiers("console.log(import.meta.url);").is_empty());
    }

    #[test]
    fn test_imports_in_comments_and_strings_ignored() {
        let source = r#"
// import a from "./commented.js";
/* import b from "./block.js"; */
const s = "import c from './string.js'";
const t = `import d from "./template.js"`;
const r = /import e from "x"/g;
obj.import("./member.js");
import real from "./real.js";
"#;
        assert_eq!(specifiers(source), vec!["./real.js"]);
    }

    #[test]
    fn test_template_substitution_is_code() {
        let source = "const t = `${ `nested ${1}` } done`;\nimport x from './after.js';";
        assert_eq!(specifiers(source), vec!["./after.js"]);
    }

    #[test]
    fn test_division_is_not_regex() {
        let source = "const half = total / 2; const q = 'a';\nimport x from './x.js';";
        assert_eq!(specifiers(source), vec!["./x.js"]);
    }

    #[test]
    fn test_regex_after_return() {
        let source = "export function q(s) { return /'/.test(s); }\nimport x from './x.js';";
        assert_eq!(specifiers(source), vec!["./x.js"]);
    }

    #[test]
    fn test_regex_after_case_and_typeof() {
        let source = "switch (v) {\n  case /\"/.source: break;\n}\nconst t = typeof /`/;\nimport './y.js';";
        assert_eq!(specifiers(source), vec!["./y.js"]);
    }

    #[test]
    fn test_division_after_member_named_like_keyword() {
        let source = "const r = opts.return / 2 + '/' + \"x\";\nimport './z.js';";
        assert_eq!(specifiers(source), vec!["./z.js"]);
    }

    #[test]
    fn test_identifier_containing_keyword() {
        assert!(specifiers("reimport('./no.js'); importer('./no.js');").is_empty());
    }

    #[test]
    fn test_multiline_import_and_line_numbers() {
        let source = "\n\nimport {\n  a,\n  b,\n} from \"./multi.js\";\n";
        let imports = scan_imports(source).unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./multi.js");
        assert_eq!(imports[0].line, 6);
    }

    #[test]
    fn test_deduplicated_and_static_wins() {
        let source = "import('./dup.js');\nimport x from './dup.js';\nimport y from './dup.js';";
        let imports = scan_imports(source).unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].kind, ImportKind::Static);
        assert_eq!(imports[0].line, 1);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = scan_imports("import x from \"./broken.js;\nfoo();").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("string"));
    }

    #[test]
    fn test_unterminated_block_comment_is_error() {
        let err = scan_imports("let a = 1;\n/* never closed").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_empty_source() {
        assert!(specifiers("").is_empty());
    }
}
