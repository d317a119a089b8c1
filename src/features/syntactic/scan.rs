//! Single-pass lexical estimate of how deep a source would nest once parsed.
//!
//! Parsing, visiting and dropping an AST all recurse on its depth, so input
//! such as `!!!!…x` or a million-term `a+a+…` chain can exhaust any thread
//! stack. This scan runs before the parser and sees those shapes without
//! building anything. Literal text and comments are skipped; every other
//! token is counted by class.

/// Nesting estimate of one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NestingEstimate {
    /// Brackets plus prefix operators, right-associative operators and
    /// nested statement heads
    pub descent: usize,
    /// `descent` plus left-associative chains (binary operators, member
    /// access, calls, sequence commas)
    pub depth: usize,
}

pub fn estimate_nesting(source: &str) -> NestingEstimate {
    let mut scanner = Scanner::new(source.as_bytes());
    scanner.run();
    scanner.estimate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Root,
    Paren,
    Args,
    Array,
    Object,
    Block,
    Template,
}

/// Counters of one bracket level
#[derive(Debug, Clone, Copy)]
struct Frame {
    open: Open,
    /// Pending prefix operators; closed by the next binary operator
    prefix: usize,
    /// Right-associative operators and statement heads; closed by `,` or statement end
    right: usize,
    chain: usize,
    /// Sequence commas; closed by statement end
    seq: usize,
}

impl Frame {
    fn new(open: Open) -> Self {
        Self {
            open,
            prefix: 0,
            right: 0,
            chain: 0,
            seq: 0,
        }
    }

    fn is_statement_level(&self) -> bool {
        matches!(self.open, Open::Root | Open::Block)
    }
}

/// What the previous token leaves the scanner expecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    /// An operand just ended; `/` divides and `(` calls
    Operand,
    /// An operand is expected
    Operator,
    /// After `.` or `?.`: the next word is a property name
    Dot,
    /// After `=>`
    Arrow,
    /// At the start of a statement
    Statement,
}

const PUNCTUATORS: [&str; 52] = [
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=",
    "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "**", "<<", ">>", "=", "<", ">", "+", "-", "*", "%", "&", "|", "^", "!", "~", "?", ":", ";",
    ",", ".", "/", "@",
];

const ASSIGNMENT: [&str; 16] = [
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=", "||=",
    "??=",
];

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    frames: Vec<Frame>,
    prev: Prev,
    line_break: bool,
    sum_descent: usize,
    sum_chain: usize,
    estimate: NestingEstimate,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            pos: 0,
            frames: vec![Frame::new(Open::Root)],
            prev: Prev::Statement,
            line_break: false,
            sum_descent: 0,
            sum_chain: 0,
            estimate: NestingEstimate::default(),
        }
    }

    fn run(&mut self) {
        while self.skip_trivia() {
            let b = self.src[self.pos];
            match b {
                b'\'' | b'"' => {
                    self.on_operand_start();
                    self.skip_string(b);
                    self.prev = Prev::Operand;
                }
                b'`' => {
                    self.on_operand_start();
                    self.pos += 1;
                    self.scan_template();
                }
                b'0'..=b'9' => {
                    self.on_operand_start();
                    self.skip_number();
                }
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.on_operand_start();
                    self.skip_number();
                }
                b'(' | b'[' | b'{' => self.open(b),
                b')' | b']' => self.close_group(),
                b'}' => self.close_brace(),
                b'/' if self.prev != Prev::Operand => {
                    self.on_operand_start();
                    self.skip_regex();
                    self.prev = Prev::Operand;
                }
                _ if is_word_byte(b) => self.word(),
                _ => self.punctuator(),
            }
            self.line_break = false;
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn record(&mut self) {
        let descent = self.frames.len() - 1 + self.sum_descent;
        let depth = descent + self.sum_chain;
        self.estimate.descent = self.estimate.descent.max(descent);
        self.estimate.depth = self.estimate.depth.max(depth);
    }

    fn add_prefix(&mut self) {
        self.top().prefix += 1;
        self.sum_descent += 1;
        self.record();
    }

    fn add_right(&mut self) {
        self.close_prefix();
        self.top().right += 1;
        self.sum_descent += 1;
        self.record();
    }

    fn add_chain(&mut self) {
        self.top().chain += 1;
        self.sum_chain += 1;
        self.record();
    }

    fn add_binary(&mut self) {
        self.close_prefix();
        self.add_chain();
    }

    fn close_prefix(&mut self) {
        let prefix = std::mem::take(&mut self.top().prefix);
        self.sum_descent -= prefix;
    }

    /// `,` closes everything but the sequence count of its level
    fn close_element(&mut self) {
        let frame = self.top();
        let (prefix, right, chain) = (frame.prefix, frame.right, frame.chain);
        frame.prefix = 0;
        frame.right = 0;
        frame.chain = 0;
        self.sum_descent -= prefix + right;
        self.sum_chain -= chain;
    }

    fn close_statement(&mut self) {
        self.close_element();
        let seq = std::mem::take(&mut self.top().seq);
        self.sum_chain -= seq;
    }

    /// A new operand on a fresh line after a finished operand starts a new
    /// statement (automatic semicolon insertion)
    fn on_operand_start(&mut self) {
        if self.line_break && self.prev == Prev::Operand && self.top().is_statement_level() {
            self.close_statement();
            self.prev = Prev::Statement;
        }
    }

    fn push(&mut self, open: Open) {
        self.frames.push(Frame::new(open));
        self.record();
    }

    fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() == 1 {
            return None;
        }
        let frame = self.frames.pop()?;
        self.sum_descent -= frame.prefix + frame.right;
        self.sum_chain -= frame.chain + frame.seq;
        Some(frame)
    }

    fn open(&mut self, b: u8) {
        self.pos += 1;
        let after_operand = self.prev == Prev::Operand;
        match b {
            b'(' => {
                if after_operand {
                    self.add_chain();
                    self.push(Open::Args);
                } else {
                    self.push(Open::Paren);
                }
                self.prev = Prev::Operator;
            }
            b'[' => {
                if after_operand {
                    self.add_chain();
                } else {
                    self.on_operand_start();
                }
                self.push(Open::Array);
                self.prev = Prev::Operator;
            }
            _ => {
                if self.prev == Prev::Operator {
                    self.push(Open::Object);
                    self.prev = Prev::Operator;
                } else {
                    self.push(Open::Block);
                    self.prev = Prev::Statement;
                }
            }
        }
    }

    fn close_group(&mut self) {
        self.pos += 1;
        self.pop();
        self.prev = Prev::Operand;
    }

    fn close_brace(&mut self) {
        self.pos += 1;
        match self.pop().map(|f| f.open) {
            Some(Open::Template) => self.scan_template(),
            Some(Open::Block) => {
                if self.top().is_statement_level() {
                    self.close_statement();
                }
                self.prev = Prev::Statement;
            }
            _ => self.prev = Prev::Operand,
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        while self.pos < self.src.len() && is_word_byte(self.src[self.pos]) {
            self.pos += 1;
        }
        if self.prev == Prev::Dot {
            self.prev = Prev::Operand;
            return;
        }
        match &self.src[start..self.pos] {
            b"in" | b"instanceof" if self.prev == Prev::Operand => {
                self.add_binary();
                self.prev = Prev::Operator;
            }
            b"typeof" | b"void" | b"delete" | b"new" | b"await" | b"yield" => {
                self.on_operand_start();
                self.add_prefix();
                self.prev = Prev::Operator;
            }
            b"if" | b"while" | b"for" | b"with" | b"do" | b"else" => {
                self.on_operand_start();
                self.add_right();
                self.prev = Prev::Statement;
            }
            b"return" | b"throw" | b"case" => {
                self.on_operand_start();
                self.prev = Prev::Operator;
            }
            b"try" | b"finally" | b"var" | b"let" | b"const" | b"switch" | b"catch" => {
                self.on_operand_start();
                self.prev = Prev::Statement;
            }
            _ => {
                self.on_operand_start();
                self.prev = Prev::Operand;
            }
        }
    }

    fn punctuator(&mut self) {
        let rest = &self.src[self.pos..];
        let Some(op) = PUNCTUATORS.iter().find(|p| rest.starts_with(p.as_bytes())) else {
            self.pos += 1;
            return;
        };
        self.pos += op.len();
        let op = *op;
        match op {
            ";" => {
                self.close_statement();
                self.prev = Prev::Statement;
            }
            "," => {
                self.close_element();
                if matches!(
                    self.top().open,
                    Open::Root | Open::Block | Open::Paren | Open::Template
                ) {
                    self.top().seq += 1;
                    self.sum_chain += 1;
                    self.record();
                }
                self.prev = Prev::Operator;
            }
            "." | "?." => {
                self.add_chain();
                self.prev = Prev::Dot;
            }
            "=>" => {
                self.add_right();
                self.prev = Prev::Arrow;
            }
            "?" | "**" => {
                self.add_right();
                self.prev = Prev::Operator;
            }
            "!" | "~" => {
                self.on_operand_start();
                self.add_prefix();
                self.prev = Prev::Operator;
            }
            "++" | "--" => {
                self.on_operand_start();
                if self.prev != Prev::Operand {
                    self.add_prefix();
                    self.prev = Prev::Operator;
                }
            }
            "+" | "-" if self.prev != Prev::Operand => {
                self.add_prefix();
                self.prev = Prev::Operator;
            }
            ":" | "..." | "@" => self.prev = Prev::Operator,
            _ if ASSIGNMENT.contains(&op) => {
                self.add_right();
                self.prev = Prev::Operator;
            }
            _ => {
                self.add_binary();
                self.prev = Prev::Operator;
            }
        }
    }

    /// Skip whitespace and comments; false at end of input
    fn skip_trivia(&mut self) -> bool {
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\n' | b'\r' => {
                    self.line_break = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.pos < self.src.len() && !matches!(self.src[self.pos], b'\n' | b'\r') {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.pos += 2;
                    while self.pos < self.src.len() && !self.src[self.pos..].starts_with(b"*/") {
                        if matches!(self.src[self.pos], b'\n' | b'\r') {
                            self.line_break = true;
                        }
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.src.len());
                }
                _ => return true,
            }
        }
        false
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' | b'\r' => return,
                c => {
                    self.pos += 1;
                    if c == quote {
                        return;
                    }
                }
            }
        }
    }

    /// Scan template text up to the closing backtick or the next `${`
    fn scan_template(&mut self) {
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    self.prev = Prev::Operand;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.push(Open::Template);
                    self.prev = Prev::Operator;
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.prev = Prev::Operand;
    }

    fn skip_number(&mut self) {
        while self.pos < self.src.len() && (is_word_byte(self.src[self.pos]) || self.src[self.pos] == b'.') {
            self.pos += 1;
        }
        self.prev = Prev::Operand;
    }

    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' | b'\r' => return,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        while self.pos < self.src.len() && is_word_byte(self.src[self.pos]) {
            self.pos += 1;
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'\\' || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est(source: &str) -> (usize, usize) {
        let e = estimate_nesting(source);
        (e.descent, e.depth)
    }

    #[test]
    fn brackets_and_calls() {
        assert_eq!(est(""), (0, 0));
        // call adds one chain link on top of three brackets
        assert_eq!(est("f([{}])"), (3, 4));
        // unbalanced closers are ignored
        assert_eq!(estimate_nesting(")))((").descent, 2);
    }

    #[test]
    fn strings_comments_and_regex_are_skipped() {
        assert_eq!(est("'(((' + \"[[[\""), (0, 1));
        assert_eq!(est("// ((((\n/* [[[[ */ x"), (0, 0));
        assert_eq!(est("x = /(((/g"), (1, 1));
        assert_eq!(est("/[/(]/.test(s)"), (1, 3));
    }

    #[test]
    fn division_is_a_binary_operator() {
        assert_eq!(est("a / b / c"), (0, 2));
    }

    #[test]
    fn statement_end_resets_chains() {
        assert_eq!(est("a + b + c; d + e"), (0, 2));
        assert_eq!(est("a + b + c\nd + e"), (0, 2));
        // a leading bracket continues the previous line
        assert_eq!(est("a + b\n(c)"), (1, 3));
    }

    #[test]
    fn array_and_argument_commas_are_flat() {
        assert_eq!(est("[a + b, c + d, e + f]"), (1, 2));
        assert_eq!(est("f(a + b, c + d)"), (1, 3));
        assert_eq!(est("a, b, c"), (0, 2));
    }

    #[test]
    fn prefix_and_right_associative_operators_descend() {
        assert_eq!(est("!!!x"), (3, 3));
        assert_eq!(est("!a + !b"), (1, 2));
        assert_eq!(est("a = b = c"), (2, 2));
        assert_eq!(est("a ? b ? c : d : e"), (2, 2));
        assert_eq!(est("typeof void x"), (2, 2));
        assert_eq!(est("x.delete(k)"), (1, 3));
    }

    #[test]
    fn template_substitutions_nest() {
        assert_eq!(est("`a${!x}b`"), (2, 2));
        assert_eq!(est("`${a}${b}` + c"), (1, 1));
    }

    #[test]
    fn blocks_close_statement_heads() {
        assert_eq!(est("if (a) { b }"), (2, 2));
        assert_eq!(est("if (a) { b } c = d"), (2, 2));
        assert_eq!(est("if (a) if (b) if (c) x;"), (4, 4));
    }

    #[test]
    fn long_flat_programs_stay_shallow() {
        let source = "x = y + 1;\n".repeat(10_000);
        assert_eq!(est(&source), (1, 2));
        let source = format!("[{}1]", "1,".repeat(10_000));
        assert_eq!(est(&source), (1, 1));
    }
}
