//! Column expressions for defines, filters, variables and weights.
//!
//! Grammar (lowest to highest precedence): `||`, `&&`, comparisons
//! (`== != < <= > >=`, non-associative), `+ -`, `* /`, unary `- !`, atoms.
//! Atoms are numbers (incl. scientific notation), `true`/`false`, column
//! names, parenthesised expressions and calls to built-ins
//! (`abs sqrt log exp pow min max`) or registered lookup tables.
//!
//! Booleans are `1.0`/`0.0`; a value is true when it is `> 0`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{FrameError, Result};
use crate::lookup::{LookupTable, MAX_LOOKUP_DIMS};

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    Column(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
    Builtin(Builtin, Vec<Node>),
    Lookup(usize, Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
enum Builtin {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Builtin {
    fn from_name(name: &str) -> Option<(Self, usize)> {
        Some(match name {
            "abs" => (Self::Abs, 1),
            "sqrt" => (Self::Sqrt, 1),
            "log" => (Self::Log, 1),
            "exp" => (Self::Exp, 1),
            "pow" => (Self::Pow, 2),
            "min" => (Self::Min, 2),
            "max" => (Self::Max, 2),
            _ => return None,
        })
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Node {
    fn eval(&self, row: &[f64], lookups: &[Arc<LookupTable>]) -> f64 {
        match self {
            Node::Const(v) => *v,
            Node::Column(i) => row[*i],
            Node::Neg(a) => -a.eval(row, lookups),
            Node::Not(a) => truth(a.eval(row, lookups) <= 0.0),
            Node::Binary(Op::And, a, b) => {
                truth(a.eval(row, lookups) > 0.0 && b.eval(row, lookups) > 0.0)
            }
            Node::Binary(Op::Or, a, b) => {
                truth(a.eval(row, lookups) > 0.0 || b.eval(row, lookups) > 0.0)
            }
            Node::Binary(op, a, b) => {
                let (l, r) = (a.eval(row, lookups), b.eval(row, lookups));
                match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div => l / r,
                    Op::Eq => truth(l == r),
                    Op::Ne => truth(l != r),
                    Op::Lt => truth(l < r),
                    Op::Le => truth(l <= r),
                    Op::Gt => truth(l > r),
                    Op::Ge => truth(l >= r),
                    Op::And | Op::Or => unreachable!("short-circuit ops handled above"),
                }
            }
            Node::Builtin(f, args) => {
                let x = args[0].eval(row, lookups);
                match f {
                    Builtin::Abs => x.abs(),
                    Builtin::Sqrt => x.sqrt(),
                    Builtin::Log => x.ln(),
                    Builtin::Exp => x.exp(),
                    Builtin::Pow => x.powf(args[1].eval(row, lookups)),
                    Builtin::Min => x.min(args[1].eval(row, lookups)),
                    Builtin::Max => x.max(args[1].eval(row, lookups)),
                }
            }
            Node::Lookup(t, args) => {
                let mut coords = [0.0; MAX_LOOKUP_DIMS];
                for (c, a) in coords.iter_mut().zip(args) {
                    *c = a.eval(row, lookups);
                }
                lookups[*t].value(&coords[..args.len()])
            }
        }
    }
}

/// A parsed expression bound to the columns and lookup tables it uses.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    root: Node,
    columns: Vec<String>,
    lookups: Vec<Arc<LookupTable>>,
}

impl CompiledExpr {
    /// Compile an expression that may only use built-in functions.
    pub fn compile(input: &str) -> Result<Self> {
        Self::compile_with(input, &HashMap::new())
    }

    /// Compile an expression, resolving unknown function names against `lookups`.
    pub fn compile_with(
        input: &str,
        lookups: &HashMap<String, Arc<LookupTable>>,
    ) -> Result<Self> {
        let tokens = lex(input)?;
        let mut p = Parser { tokens: &tokens, pos: 0, lookups, columns: Vec::new(), tables: Vec::new() };
        let root = p.or_expr()?;
        if let Some(tok) = p.tokens.get(p.pos) {
            return Err(FrameError::Expression(format!(
                "unexpected {tok:?} after end of expression '{input}'"
            )));
        }
        Ok(Self { source: input.to_string(), root, columns: p.columns, lookups: p.tables })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Column names referenced, in order of first occurrence.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Evaluate for one row; `row[i]` is the value of `columns()[i]`.
    pub fn eval_row(&self, row: &[f64]) -> f64 {
        self.root.eval(row, &self.lookups)
    }

    /// Evaluate the rows `rows` of the full-length `columns` (same order as
    /// [`columns()`](Self::columns)).
    pub fn eval_rows(&self, columns: &[&[f64]], rows: &[u32]) -> Vec<f64> {
        let mut buf = vec![0.0; columns.len()];
        rows.iter()
            .map(|&r| {
                for (slot, col) in buf.iter_mut().zip(columns) {
                    *slot = col[r as usize];
                }
                self.eval_row(&buf)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Sym(&'static str),
}

const SYMBOLS: [&str; 16] =
    ["&&", "||", "==", "!=", "<=", ">=", "+", "-", "*", "/", "(", ")", ",", "<", ">", "!"];

fn lex(input: &str) -> Result<Vec<Tok>> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    'outer: while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            while i < bytes.len() {
                let d = bytes[i] as char;
                let exp_sign = (d == '+' || d == '-') && matches!(bytes[i - 1], b'e' | b'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exp_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            // C-style float suffix, e.g. `2.5f`.
            let text = &input[start..i];
            if bytes.get(i) == Some(&b'f') {
                i += 1;
            }
            let v = text
                .parse::<f64>()
                .map_err(|_| FrameError::Expression(format!("invalid number '{text}'")))?;
            out.push(Tok::Num(v));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(Tok::Ident(input[start..i].to_string()));
            continue;
        }
        for sym in SYMBOLS {
            if input[i..].starts_with(sym) {
                out.push(Tok::Sym(sym));
                i += sym.len();
                continue 'outer;
            }
        }
        return Err(FrameError::Expression(format!(
            "unexpected character '{c}' in expression '{input}'"
        )));
    }
    Ok(out)
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    lookups: &'a HashMap<String, Arc<LookupTable>>,
    columns: Vec<String>,
    tables: Vec<Arc<LookupTable>>,
}

impl Parser<'_> {
    fn peek_sym(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Tok::Sym(s)) => Some(s),
            _ => None,
        }
    }

    fn eat(&mut self, sym: &str) -> bool {
        if self.peek_sym() == Some(sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, sym: &str) -> Result<()> {
        if self.eat(sym) {
            Ok(())
        } else {
            Err(FrameError::Expression(format!(
                "expected '{sym}', found {:?}",
                self.tokens.get(self.pos)
            )))
        }
    }

    fn column_slot(&mut self, name: &str) -> usize {
        match self.columns.iter().position(|c| c == name) {
            Some(i) => i,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        }
    }

    fn or_expr(&mut self) -> Result<Node> {
        let mut lhs = self.and_expr()?;
        while self.eat("||") {
            lhs = Node::Binary(Op::Or, Box::new(lhs), Box::new(self.and_expr()?));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Node> {
        let mut lhs = self.cmp_expr()?;
        while self.eat("&&") {
            lhs = Node::Binary(Op::And, Box::new(lhs), Box::new(self.cmp_expr()?));
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Node> {
        let lhs = self.add_expr()?;
        let op = match self.peek_sym() {
            Some("==") => Op::Eq,
            Some("!=") => Op::Ne,
            Some("<") => Op::Lt,
            Some("<=") => Op::Le,
            Some(">") => Op::Gt,
            Some(">=") => Op::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        Ok(Node::Binary(op, Box::new(lhs), Box::new(self.add_expr()?)))
    }

    fn add_expr(&mut self) -> Result<Node> {
        let mut lhs = self.mul_expr()?;
        loop {
            let op = match self.peek_sym() {
                Some("+") => Op::Add,
                Some("-") => Op::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(self.mul_expr()?));
        }
    }

    fn mul_expr(&mut self) -> Result<Node> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_sym() {
                Some("*") => Op::Mul,
                Some("/") => Op::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> Result<Node> {
        if self.eat("-") {
            return Ok(Node::Neg(Box::new(self.unary()?)));
        }
        if self.eat("!") {
            return Ok(Node::Not(Box::new(self.unary()?)));
        }
        if self.eat("+") {
            return self.unary();
        }
        self.atom()
    }

    fn args(&mut self) -> Result<Vec<Node>> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.or_expr()?);
            if self.eat(")") {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }

    fn atom(&mut self) -> Result<Node> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match tok {
            Some(Tok::Num(v)) => Ok(Node::Const(v)),
            Some(Tok::Sym("(")) => {
                let inner = self.or_expr()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(Tok::Ident(name)) if self.eat("(") => self.call(&name),
            Some(Tok::Ident(name)) => Ok(match name.as_str() {
                "true" => Node::Const(1.0),
                "false" => Node::Const(0.0),
                _ => Node::Column(self.column_slot(&name)),
            }),
            other => Err(FrameError::Expression(format!(
                "expected number, column, call or '(', found {other:?}"
            ))),
        }
    }

    fn call(&mut self, name: &str) -> Result<Node> {
        let args = self.args()?;
        if let Some((f, arity)) = Builtin::from_name(name) {
            if args.len() != arity {
                return Err(FrameError::Expression(format!(
                    "{name}() takes {arity} argument(s), got {}",
                    args.len()
                )));
            }
            return Ok(Node::Builtin(f, args));
        }
        let Some(table) = self.lookups.get(name) else {
            return Err(FrameError::Expression(format!("unknown function '{name}'")));
        };
        if args.is_empty() || args.len() > MAX_LOOKUP_DIMS {
            return Err(FrameError::Expression(format!(
                "lookup {name}() takes 1..={MAX_LOOKUP_DIMS} arguments, got {}",
                args.len()
            )));
        }
        let slot = match self.tables.iter().position(|t| Arc::ptr_eq(t, table)) {
            Some(i) => i,
            None => {
                self.tables.push(Arc::clone(table));
                self.tables.len() - 1
            }
        };
        Ok(Node::Lookup(slot, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::BinEdges;

    fn eval(src: &str, row: &[f64]) -> f64 {
        CompiledExpr::compile(src).unwrap().eval_row(row)
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("2 + 3 * 4", &[]), 14.0);
        assert_eq!(eval("(2 + 3) * 4", &[]), 20.0);
        assert_eq!(eval("-2 * -3", &[]), 6.0);
        assert_eq!(eval("1 + 2 > 2 && 4 / 2 == 2", &[]), 1.0);
    }

    #[test]
    fn columns_in_first_occurrence_order() {
        let e = CompiledExpr::compile("pt * w + pt / eta").unwrap();
        assert_eq!(e.columns(), ["pt", "w", "eta"]);
        assert_eq!(e.eval_row(&[10.0, 0.5, 2.0]), 10.0);
    }

    #[test]
    fn selections() {
        let e = CompiledExpr::compile("njet >= 4 && pt_lead > 25.0").unwrap();
        assert_eq!(e.eval_row(&[4.0, 30.0]), 1.0);
        assert_eq!(e.eval_row(&[3.0, 30.0]), 0.0);
        assert_eq!(eval("!(x > 3) || x == 7", &[7.0]), 1.0);
        assert_eq!(eval("isReco", &[0.0]), 0.0);
        assert_eq!(eval("true && !false", &[]), 1.0);
    }

    #[test]
    fn builtins_and_arity() {
        assert_eq!(eval("sqrt(x)", &[9.0]), 3.0);
        assert_eq!(eval("pow(x, 2)", &[3.0]), 9.0);
        assert_eq!(eval("max(a, min(b, 1))", &[0.5, 7.0]), 1.0);
        assert_eq!(eval("abs(-x)", &[2.0]), 2.0);
        let err = CompiledExpr::compile("pow(x)").unwrap_err();
        assert!(err.to_string().contains("takes 2"));
        assert!(CompiledExpr::compile("frobnicate(x)").is_err());
    }

    #[test]
    fn numbers() {
        assert!((eval("1.5e2 + 3.0E-1", &[]) - 150.3).abs() < 1e-10);
        assert_eq!(eval(".5 + 2.5f", &[]), 3.0);
    }

    #[test]
    fn syntax_errors() {
        assert!(CompiledExpr::compile("a +").is_err());
        assert!(CompiledExpr::compile("(a").is_err());
        assert!(CompiledExpr::compile("a b").is_err());
        assert!(CompiledExpr::compile("a $ b").is_err());
    }

    #[test]
    fn lookup_calls() {
        let table = LookupTable::new(
            vec![BinEdges::new(vec![0.0, 10.0, 20.0]).unwrap()],
            vec![0.9, 1.1],
        )
        .unwrap();
        let mut lookups = HashMap::new();
        lookups.insert("sf".to_string(), Arc::new(table));
        let e = CompiledExpr::compile_with("w * sf(pt)", &lookups).unwrap();
        assert_eq!(e.columns(), ["w", "pt"]);
        assert!((e.eval_row(&[2.0, 15.0]) - 2.2).abs() < 1e-12);
        assert_eq!(e.eval_row(&[2.0, 25.0]), 0.0);
        assert!(CompiledExpr::compile_with("sf()", &lookups).is_err());
    }

    #[test]
    fn eval_selected_rows() {
        let e = CompiledExpr::compile("a + b").unwrap();
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(e.eval_rows(&[&a, &b], &[0, 2, 3]), vec![11.0, 33.0, 44.0]);
    }
}
