//! Guard-condition and parameter-expression evaluation.
//!
//! Catalogue attributes embed expressions wrapped in `${...}` or `#{...}`.
//! Each distinct string is compiled once at catalogue load into a small
//! AST (`Script`); evaluation is side-effect-free and total: anything
//! malformed or outside the modeled vocabulary degrades to `false` / `0`
//! with a logged diagnostic instead of aborting the tick.

mod parse;

use crate::environment::Environment;
use crate::math::Vec2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
}

/// Read-only snapshot a script evaluates against.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub anchor: Vec2,
    pub looking_right: bool,
    pub dragging: bool,
    pub time: u32,
    pub total_count: usize,
    pub env: &'a Environment,
}

/// Runtime value. Points exist so border predicates can take
/// `mascot.anchor` / `mascot.environment.cursor` as an argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Num(f32),
    Bool(bool),
    Point(Vec2),
}

impl Value {
    fn as_num(self) -> f32 {
        match self {
            Value::Num(n) => n,
            Value::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Point(_) => f32::NAN,
        }
    }

    fn truthy(self) -> bool {
        match self {
            Value::Num(n) => n != 0.0,
            Value::Bool(b) => b,
            Value::Point(_) => true,
        }
    }
}

/// Context fields addressable from expressions. The `mascot.` prefix is
/// optional, matching the legacy evaluator's scoping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Field {
    Anchor,
    AnchorX,
    AnchorY,
    LookingRight,
    Dragging,
    Time,
    TotalCount,
    Cursor,
    CursorX,
    CursorY,
    CursorDx,
    CursorDy,
    ScreenWidth,
    ScreenHeight,
    WorkAreaLeft,
    WorkAreaRight,
    WorkAreaTop,
    WorkAreaBottom,
    WorkAreaWidth,
    WorkAreaHeight,
    /// Legacy interactive-window fields. Unmodeled, always 0.
    IeZero,
    AllowsBreeding,
    AllowsHotspots,
    MathPi,
}

impl Field {
    pub(crate) fn resolve(path: &str) -> Option<Field> {
        let path = path.strip_prefix("mascot.").unwrap_or(path);
        let field = match path {
            "anchor" => Field::Anchor,
            "anchor.x" => Field::AnchorX,
            "anchor.y" => Field::AnchorY,
            "lookingRight" | "lookRight" => Field::LookingRight,
            "dragging" => Field::Dragging,
            "time" => Field::Time,
            "totalCount" => Field::TotalCount,
            "environment.cursor" => Field::Cursor,
            "environment.cursor.x" => Field::CursorX,
            "environment.cursor.y" => Field::CursorY,
            "environment.cursor.dx" => Field::CursorDx,
            "environment.cursor.dy" => Field::CursorDy,
            "environment.screen.width" => Field::ScreenWidth,
            "environment.screen.height" => Field::ScreenHeight,
            "environment.workArea.left" => Field::WorkAreaLeft,
            "environment.workArea.right" => Field::WorkAreaRight,
            "environment.workArea.top" => Field::WorkAreaTop,
            "environment.workArea.bottom" => Field::WorkAreaBottom,
            "environment.workArea.width" => Field::WorkAreaWidth,
            "environment.workArea.height" => Field::WorkAreaHeight,
            "environment.allowsBreeding" => Field::AllowsBreeding,
            "environment.allowsHotspots" => Field::AllowsHotspots,
            "Math.PI" => Field::MathPi,
            _ if path.starts_with("environment.activeIE.") => Field::IeZero,
            _ => return None,
        };
        Some(field)
    }
}

/// Built-in predicate and math calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Func {
    OnFloor,
    OnCeiling,
    OnLeftWall,
    OnRightWall,
    /// Legacy interactive-window predicates. Unmodeled, always false.
    IeNever,
    GetX,
    GetY,
    Abs,
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Pow,
    Sin,
    Cos,
    Random,
}

impl Func {
    pub(crate) fn resolve(path: &str) -> Option<Func> {
        let path = path.strip_prefix("mascot.").unwrap_or(path);
        let func = match path {
            "environment.floor.isOn" => Func::OnFloor,
            "environment.ceiling.isOn" => Func::OnCeiling,
            "environment.workArea.leftBorder.isOn" => Func::OnLeftWall,
            "environment.workArea.rightBorder.isOn" => Func::OnRightWall,
            "getX" => Func::GetX,
            "getY" => Func::GetY,
            "Math.abs" => Func::Abs,
            "Math.min" => Func::Min,
            "Math.max" => Func::Max,
            "Math.floor" => Func::Floor,
            "Math.ceil" => Func::Ceil,
            "Math.round" => Func::Round,
            "Math.sqrt" => Func::Sqrt,
            "Math.pow" => Func::Pow,
            "Math.sin" => Func::Sin,
            "Math.cos" => Func::Cos,
            "Math.random" => Func::Random,
            _ if path.starts_with("environment.activeIE.") => Func::IeNever,
            _ => return None,
        };
        Some(func)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Num(f32),
    Bool(bool),
    Field(Field),
    Call(Func, Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Literal(Value),
    Expr(Expr),
    /// Failed to compile; evaluates to false / 0.
    Invalid,
}

/// A compiled guard condition or numeric parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    source: String,
    body: Body,
}

impl Script {
    /// Compile a raw attribute value. Never fails: unparseable or
    /// out-of-vocabulary sources become `Invalid` with one diagnostic here,
    /// and evaluate to false / 0 from then on.
    pub fn parse(source: &str) -> Script {
        let trimmed = source.trim();
        let body = match trimmed {
            "true" => Body::Literal(Value::Bool(true)),
            "false" => Body::Literal(Value::Bool(false)),
            _ => {
                if let Ok(n) = trimmed.parse::<f32>() {
                    Body::Literal(Value::Num(n))
                } else {
                    match parse::parse_expr(&strip_wrappers(trimmed)) {
                        Ok(expr) => Body::Expr(expr),
                        Err(err) => {
                            log::warn!("unsupported expression {trimmed:?}: {err}");
                            Body::Invalid
                        }
                    }
                }
            }
        };
        Script {
            source: trimmed.to_owned(),
            body,
        }
    }

    pub fn literal_true() -> Script {
        Script {
            source: "true".to_owned(),
            body: Body::Literal(Value::Bool(true)),
        }
    }

    pub fn literal_num(value: f32) -> Script {
        Script {
            source: value.to_string(),
            body: Body::Literal(Value::Num(value)),
        }
    }

    /// Conjunction of two scripts (used when a condition group wraps a
    /// behavior that carries its own condition).
    pub fn and(left: &Script, right: &Script) -> Script {
        let source = format!("({}) && ({})", left.source, right.source);
        let body = match (left.body.as_expr(), right.body.as_expr()) {
            (Some(a), Some(b)) => {
                Body::Expr(Expr::Binary(BinOp::And, Box::new(a), Box::new(b)))
            }
            _ => Body::Invalid,
        };
        Script { source, body }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when this is the default `true` guard (references with an
    /// explicit guard shadow the referenced action's own guard).
    pub fn is_default_true(&self) -> bool {
        self.body == Body::Literal(Value::Bool(true))
    }

    pub fn eval_bool(&self, ctx: &EvalContext) -> bool {
        match &self.body {
            Body::Literal(v) => v.truthy(),
            Body::Expr(expr) => eval(expr, ctx).truthy(),
            Body::Invalid => false,
        }
    }

    pub fn eval_num(&self, ctx: &EvalContext) -> f32 {
        match &self.body {
            Body::Literal(v) => v.as_num(),
            Body::Expr(expr) => eval(expr, ctx).as_num(),
            Body::Invalid => 0.0,
        }
    }
}

impl Body {
    fn as_expr(&self) -> Option<Expr> {
        match self {
            Body::Literal(Value::Num(n)) => Some(Expr::Num(*n)),
            Body::Literal(Value::Bool(b)) => Some(Expr::Bool(*b)),
            Body::Literal(Value::Point(_)) => None,
            Body::Expr(expr) => Some(expr.clone()),
            Body::Invalid => None,
        }
    }
}

/// Unwrap every `${...}` / `#{...}` occurrence into a parenthesized
/// sub-expression, leaving surrounding text in place.
fn strip_wrappers(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if (bytes[i] == b'$' || bytes[i] == b'#')
            && i + 1 < bytes.len()
            && bytes[i + 1] == b'{'
        {
            if let Some(close) = source[i + 2..].find('}') {
                out.push('(');
                out.push_str(&source[i + 2..i + 2 + close]);
                out.push(')');
                i += 2 + close + 1;
                continue;
            }
        }
        let ch = source[i..].chars().next().unwrap_or('\0');
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn eval(expr: &Expr, ctx: &EvalContext) -> Value {
    match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Field(field) => eval_field(*field, ctx),
        Expr::Call(func, args) => eval_call(*func, args, ctx),
        Expr::Unary(op, inner) => {
            let value = eval(inner, ctx);
            match op {
                UnOp::Neg => Value::Num(-value.as_num()),
                UnOp::Not => Value::Bool(!value.truthy()),
            }
        }
        Expr::Binary(op, left, right) => eval_binary(*op, left, right, ctx),
        Expr::Ternary(cond, then, otherwise) => {
            if eval(cond, ctx).truthy() {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
    }
}

fn eval_field(field: Field, ctx: &EvalContext) -> Value {
    let wa = &ctx.env.work_area;
    match field {
        Field::Anchor => Value::Point(ctx.anchor),
        Field::AnchorX => Value::Num(ctx.anchor.x),
        Field::AnchorY => Value::Num(ctx.anchor.y),
        Field::LookingRight => Value::Bool(ctx.looking_right),
        Field::Dragging => Value::Bool(ctx.dragging),
        Field::Time => Value::Num(ctx.time as f32),
        Field::TotalCount => Value::Num(ctx.total_count as f32),
        Field::Cursor => Value::Point(ctx.env.cursor),
        Field::CursorX => Value::Num(ctx.env.cursor.x),
        Field::CursorY => Value::Num(ctx.env.cursor.y),
        Field::CursorDx => Value::Num(ctx.env.cursor_delta.x),
        Field::CursorDy => Value::Num(ctx.env.cursor_delta.y),
        Field::ScreenWidth => Value::Num(ctx.env.screen_size().x),
        Field::ScreenHeight => Value::Num(ctx.env.screen_size().y),
        Field::WorkAreaLeft => Value::Num(wa.left()),
        Field::WorkAreaRight => Value::Num(wa.right()),
        Field::WorkAreaTop => Value::Num(wa.top()),
        Field::WorkAreaBottom => Value::Num(wa.bottom()),
        Field::WorkAreaWidth => Value::Num(wa.width),
        Field::WorkAreaHeight => Value::Num(wa.height),
        Field::IeZero => Value::Num(0.0),
        Field::AllowsBreeding => Value::Bool(true),
        Field::AllowsHotspots => Value::Bool(true),
        Field::MathPi => Value::Num(std::f32::consts::PI),
    }
}

fn eval_call(func: Func, args: &[Expr], ctx: &EvalContext) -> Value {
    let point = |index: usize| -> Vec2 {
        match args.get(index).map(|a| eval(a, ctx)) {
            Some(Value::Point(p)) => p,
            _ => ctx.anchor,
        }
    };
    let num = |index: usize| -> f32 {
        args.get(index).map_or(0.0, |a| eval(a, ctx).as_num())
    };
    match func {
        Func::OnFloor => Value::Bool(ctx.env.is_on_floor(point(0))),
        Func::OnCeiling => Value::Bool(ctx.env.is_on_ceiling(point(0))),
        Func::OnLeftWall => Value::Bool(ctx.env.is_on_left_wall(point(0))),
        Func::OnRightWall => Value::Bool(ctx.env.is_on_right_wall(point(0))),
        Func::IeNever => Value::Bool(false),
        Func::GetX => Value::Num(ctx.anchor.x),
        Func::GetY => Value::Num(ctx.anchor.y),
        Func::Abs => Value::Num(num(0).abs()),
        Func::Min => Value::Num(num(0).min(num(1))),
        Func::Max => Value::Num(num(0).max(num(1))),
        Func::Floor => Value::Num(num(0).floor()),
        Func::Ceil => Value::Num(num(0).ceil()),
        Func::Round => Value::Num(num(0).round()),
        Func::Sqrt => Value::Num(num(0).sqrt()),
        Func::Pow => Value::Num(num(0).powf(num(1))),
        Func::Sin => Value::Num(num(0).sin()),
        Func::Cos => Value::Num(num(0).cos()),
        Func::Random => Value::Num(fastrand::f32()),
    }
}

fn eval_binary(op: BinOp, left: &Expr, right: &Expr, ctx: &EvalContext) -> Value {
    match op {
        BinOp::Or => {
            let l = eval(left, ctx);
            if l.truthy() {
                return l;
            }
            eval(right, ctx)
        }
        BinOp::And => {
            let l = eval(left, ctx);
            if !l.truthy() {
                return l;
            }
            eval(right, ctx)
        }
        BinOp::Eq | BinOp::Ne => {
            let l = eval(left, ctx);
            let r = eval(right, ctx);
            let equal = match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (a, b) => a.as_num() == b.as_num(),
            };
            Value::Bool(if op == BinOp::Eq { equal } else { !equal })
        }
        BinOp::Lt => Value::Bool(eval(left, ctx).as_num() < eval(right, ctx).as_num()),
        BinOp::Le => Value::Bool(eval(left, ctx).as_num() <= eval(right, ctx).as_num()),
        BinOp::Gt => Value::Bool(eval(left, ctx).as_num() > eval(right, ctx).as_num()),
        BinOp::Ge => Value::Bool(eval(left, ctx).as_num() >= eval(right, ctx).as_num()),
        BinOp::Add => Value::Num(eval(left, ctx).as_num() + eval(right, ctx).as_num()),
        BinOp::Sub => Value::Num(eval(left, ctx).as_num() - eval(right, ctx).as_num()),
        BinOp::Mul => Value::Num(eval(left, ctx).as_num() * eval(right, ctx).as_num()),
        BinOp::Div => Value::Num(eval(left, ctx).as_num() / eval(right, ctx).as_num()),
        BinOp::Rem => Value::Num(eval(left, ctx).as_num() % eval(right, ctx).as_num()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::math::Rect;

    fn ctx(env: &Environment, anchor: Vec2) -> EvalContext<'_> {
        EvalContext {
            anchor,
            looking_right: true,
            dragging: false,
            time: 0,
            total_count: 1,
            env,
        }
    }

    fn env() -> Environment {
        Environment::new(Rect::new(0.0, 0.0, 400.0, 300.0))
    }

    #[test]
    fn anchor_comparison() {
        let env = env();
        let script = Script::parse("${mascot.anchor.x > 50}");
        assert!(script.eval_bool(&ctx(&env, Vec2::new(60.0, 0.0))));
        assert!(!script.eval_bool(&ctx(&env, Vec2::new(10.0, 0.0))));
    }

    #[test]
    fn malformed_defaults_to_false_and_zero() {
        let env = env();
        let script = Script::parse("${invalid...}");
        assert!(!script.eval_bool(&ctx(&env, Vec2::ZERO)));
        assert_eq!(script.eval_num(&ctx(&env, Vec2::ZERO)), 0.0);
    }

    #[test]
    fn plain_literals_skip_the_expression_path() {
        let env = env();
        assert_eq!(Script::parse("42").eval_num(&ctx(&env, Vec2::ZERO)), 42.0);
        assert_eq!(Script::parse("-1.5").eval_num(&ctx(&env, Vec2::ZERO)), -1.5);
        assert!(Script::parse("true").eval_bool(&ctx(&env, Vec2::ZERO)));
        assert!(!Script::parse("false").eval_bool(&ctx(&env, Vec2::ZERO)));
    }

    #[test]
    fn border_predicates_default_to_own_anchor() {
        let env = env();
        let script = Script::parse("${mascot.environment.floor.isOn(mascot.anchor)}");
        assert!(script.eval_bool(&ctx(&env, Vec2::new(100.0, 300.0))));
        let implicit = Script::parse("${mascot.environment.floor.isOn()}");
        assert!(implicit.eval_bool(&ctx(&env, Vec2::new(100.0, 300.0))));
        assert!(!implicit.eval_bool(&ctx(&env, Vec2::new(100.0, 100.0))));
    }

    #[test]
    fn legacy_window_fields_are_inert() {
        let env = env();
        let script = Script::parse("${mascot.environment.activeIE.visible()}");
        assert!(!script.eval_bool(&ctx(&env, Vec2::ZERO)));
        let width = Script::parse("${mascot.environment.activeIE.width}");
        assert_eq!(width.eval_num(&ctx(&env, Vec2::ZERO)), 0.0);
    }

    #[test]
    fn arithmetic_and_ternary() {
        let env = env();
        let script = Script::parse("${mascot.environment.workArea.width / 2 + 10}");
        assert_eq!(script.eval_num(&ctx(&env, Vec2::ZERO)), 210.0);
        let pick = Script::parse("${mascot.anchor.x > 50 ? 1 : 2}");
        assert_eq!(pick.eval_num(&ctx(&env, Vec2::new(60.0, 0.0))), 1.0);
        assert_eq!(pick.eval_num(&ctx(&env, Vec2::new(40.0, 0.0))), 2.0);
    }

    #[test]
    fn multiple_wrappers_combine() {
        let env = env();
        let script = Script::parse("${mascot.anchor.x} + #{mascot.anchor.y}");
        assert_eq!(script.eval_num(&ctx(&env, Vec2::new(3.0, 4.0))), 7.0);
    }

    #[test]
    fn conjunction_helper() {
        let env = env();
        let a = Script::parse("${mascot.anchor.x > 10}");
        let b = Script::parse("${mascot.anchor.y > 10}");
        let both = Script::and(&a, &b);
        assert!(both.eval_bool(&ctx(&env, Vec2::new(20.0, 20.0))));
        assert!(!both.eval_bool(&ctx(&env, Vec2::new(20.0, 5.0))));
    }
}
