//! Per-channel shader programs.
//!
//! A [`ChannelProgram`] is a short list of `let` bindings followed by a
//! result expression, over a single scalar input. It is what the generator
//! emits as WGSL and what a software executor interprets, so both paths see
//! the same expression tree, constants included.

use std::fmt::{self, Write};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Comparison used by [`Expr::Select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmp {
    /// `lhs < rhs`
    Lt,
    /// `lhs >= rhs`
    Ge,
}

impl Cmp {
    /// WGSL operator token.
    pub fn token(&self) -> &'static str {
        match self {
            Cmp::Lt => "<",
            Cmp::Ge => ">=",
        }
    }

    /// Evaluate the comparison. NaN operands compare false.
    #[inline]
    pub fn test<T: PartialOrd>(&self, lhs: T, rhs: T) -> bool {
        match self {
            Cmp::Lt => lhs < rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }
}

/// Scalar expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The channel input value.
    Input,
    /// f32 literal.
    Const(f32),
    /// Reference to an earlier `let` binding.
    Local(usize),
    /// `abs(e)`
    Abs(Box<Expr>),
    /// `-e`
    Neg(Box<Expr>),
    /// `a + b`
    Add(Box<Expr>, Box<Expr>),
    /// `a - b`
    Sub(Box<Expr>, Box<Expr>),
    /// `a * b`
    Mul(Box<Expr>, Box<Expr>),
    /// `a / b`
    Div(Box<Expr>, Box<Expr>),
    /// `pow(base, exp)`
    Pow(Box<Expr>, Box<Expr>),
    /// `select(if_false, if_true, lhs <cmp> rhs)`
    Select {
        /// Comparison operator.
        cmp: Cmp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Value when the comparison holds.
        if_true: Box<Expr>,
        /// Value otherwise.
        if_false: Box<Expr>,
    },
}

impl Expr {
    /// Literal from an f64 constant, rounded to f32.
    pub fn constant(value: f64) -> Self {
        Expr::Const(value as f32)
    }

    /// `abs(self)`
    pub fn abs(self) -> Self {
        Expr::Abs(Box::new(self))
    }

    /// `pow(self, exp)`
    pub fn pow(self, exp: Expr) -> Self {
        Expr::Pow(Box::new(self), Box::new(exp))
    }

    /// `select(if_false, if_true, lhs <cmp> rhs)`
    pub fn select(cmp: Cmp, lhs: Expr, rhs: Expr, if_true: Expr, if_false: Expr) -> Self {
        Expr::Select {
            cmp,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    /// Evaluate in f64 with `lets` already computed.
    pub fn eval_f64(&self, input: f64, lets: &[f64]) -> f64 {
        match self {
            Expr::Input => input,
            Expr::Const(v) => f64::from(*v),
            Expr::Local(i) => lets.get(*i).copied().unwrap_or(f64::NAN),
            Expr::Abs(e) => e.eval_f64(input, lets).abs(),
            Expr::Neg(e) => -e.eval_f64(input, lets),
            Expr::Add(a, b) => a.eval_f64(input, lets) + b.eval_f64(input, lets),
            Expr::Sub(a, b) => a.eval_f64(input, lets) - b.eval_f64(input, lets),
            Expr::Mul(a, b) => a.eval_f64(input, lets) * b.eval_f64(input, lets),
            Expr::Div(a, b) => a.eval_f64(input, lets) / b.eval_f64(input, lets),
            Expr::Pow(a, b) => a.eval_f64(input, lets).powf(b.eval_f64(input, lets)),
            Expr::Select { cmp, lhs, rhs, if_true, if_false } => {
                if cmp.test(lhs.eval_f64(input, lets), rhs.eval_f64(input, lets)) {
                    if_true.eval_f64(input, lets)
                } else {
                    if_false.eval_f64(input, lets)
                }
            }
        }
    }

    /// Write WGSL for this expression.
    pub fn write_wgsl(&self, out: &mut String) -> fmt::Result {
        match self {
            Expr::Input => out.write_str("x"),
            Expr::Const(v) => write_float(out, *v),
            Expr::Local(i) => write!(out, "t{i}"),
            Expr::Abs(e) => write_call(out, "abs", &[e]),
            Expr::Neg(e) => {
                out.write_str("-(")?;
                e.write_wgsl(out)?;
                out.write_str(")")
            }
            Expr::Add(a, b) => write_binary(out, a, "+", b),
            Expr::Sub(a, b) => write_binary(out, a, "-", b),
            Expr::Mul(a, b) => write_binary(out, a, "*", b),
            Expr::Div(a, b) => write_binary(out, a, "/", b),
            Expr::Pow(a, b) => write_call(out, "pow", &[a, b]),
            Expr::Select { cmp, lhs, rhs, if_true, if_false } => {
                out.write_str("select(")?;
                if_false.write_wgsl(out)?;
                out.write_str(", ")?;
                if_true.write_wgsl(out)?;
                out.write_str(", ")?;
                write_binary(out, lhs, cmp.token(), rhs)?;
                out.write_str(")")
            }
        }
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

/// WGSL f32 literal. Debug formatting round-trips the exact f32 value.
fn write_float(out: &mut String, v: f32) -> fmt::Result {
    if v.is_sign_negative() {
        write!(out, "({v:?}f)")
    } else {
        write!(out, "{v:?}f")
    }
}

fn write_call(out: &mut String, name: &str, args: &[&Expr]) -> fmt::Result {
    write!(out, "{name}(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        arg.write_wgsl(out)?;
    }
    out.write_str(")")
}

fn write_binary(out: &mut String, a: &Expr, op: &str, b: &Expr) -> fmt::Result {
    out.write_str("(")?;
    a.write_wgsl(out)?;
    write!(out, " {op} ")?;
    b.write_wgsl(out)?;
    out.write_str(")")
}

/// One channel: `let` bindings then a result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelProgram {
    lets: Vec<Expr>,
    result: Option<Expr>,
}

impl ChannelProgram {
    /// Starts an empty program (result defaults to the input).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding and returns a reference to it.
    pub fn bind(&mut self, expr: Expr) -> Expr {
        self.lets.push(expr);
        Expr::Local(self.lets.len() - 1)
    }

    /// Sets the result expression.
    pub fn finish(mut self, result: Expr) -> Self {
        self.result = Some(result);
        self
    }

    /// Bindings in order.
    pub fn lets(&self) -> &[Expr] {
        &self.lets
    }

    /// Result expression.
    pub fn result(&self) -> &Expr {
        self.result.as_ref().unwrap_or(&Expr::Input)
    }

    /// Evaluate in f64 (used for baking).
    pub fn eval_f64(&self, x: f64) -> f64 {
        let mut values = Vec::with_capacity(self.lets.len());
        for expr in &self.lets {
            let v = expr.eval_f64(x, &values);
            values.push(v);
        }
        self.result().eval_f64(x, &values)
    }

    /// Write `fn <name>(x: f32) -> f32 { ... }`.
    pub fn write_wgsl_fn(&self, out: &mut String, name: &str) -> fmt::Result {
        writeln!(out, "fn {name}(x: f32) -> f32 {{")?;
        for (i, expr) in self.lets.iter().enumerate() {
            write!(out, "    let t{i} = ")?;
            expr.write_wgsl(out)?;
            writeln!(out, ";")?;
        }
        out.write_str("    return ")?;
        self.result().write_wgsl(out)?;
        writeln!(out, ";")?;
        writeln!(out, "}}")
    }
}

/// Four channel programs (RGBA).
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram {
    channels: [ChannelProgram; 4],
}

impl ShaderProgram {
    /// Creates from per-channel programs.
    pub fn new(channels: [ChannelProgram; 4]) -> Self {
        Self { channels }
    }

    /// Channel programs (RGBA).
    pub fn channels(&self) -> &[ChannelProgram; 4] {
        &self.channels
    }

    /// Evaluate a pixel in f64.
    pub fn eval_f64(&self, pixel: [f64; 4]) -> [f64; 4] {
        std::array::from_fn(|c| self.channels[c].eval_f64(pixel[c]))
    }
}
