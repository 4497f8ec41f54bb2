use crate::parser::{Expr, LiteralValue};
use crate::token::format_number_literal;

/// Converts an expression to fully parenthesised prefix form, e.g.
/// `-123 * (45.67)` → `(* (- 123.0) (group 45.67))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => format_number_literal(*n),
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => Self::parenthesize("group", &[&**inner]),

            // ── unary operator ──────────────────────────────────────────
            Expr::Unary { operator, right } => Self::parenthesize(operator.lexeme, &[&**right]),

            // ── binary / logical operator ───────────────────────────────
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(operator.lexeme, &[&**left, &**right]),

            // ── variables and assignment ────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => {
                Self::parenthesize(&format!(".{}", name.lexeme), &[&**object])
            }

            Expr::Set {
                object,
                name,
                value,
            } => Self::parenthesize(&format!(".{}=", name.lexeme), &[&**object, &**value]),

            Expr::This { .. } => "this".into(),
        }
    }

    fn parenthesize(name: &str, exprs: &[&Expr<'_>]) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::print(expr));
        }
        s.push(')');
        s
    }
}
