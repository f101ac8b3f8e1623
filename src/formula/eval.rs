use super::parser::{BinaryOp, Expr, Function};

/// Evaluates a parsed expression. Every intermediate result must be finite.
pub fn evaluate(expr: &Expr) -> Result<f64, String> {
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Negate(inner) => -evaluate(inner)?,
        Expr::Binary { op, lhs, rhs } => {
            let l = evaluate(lhs)?;
            let r = evaluate(rhs)?;
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Subtract => l - r,
                BinaryOp::Multiply => l * r,
                BinaryOp::Divide => {
                    if r == 0.0 {
                        return Err("division by zero".into());
                    }
                    l / r
                }
                BinaryOp::Power => l.powf(r),
                BinaryOp::Less => truth(l < r),
                BinaryOp::LessEqual => truth(l <= r),
                BinaryOp::Greater => truth(l > r),
                BinaryOp::GreaterEqual => truth(l >= r),
                BinaryOp::Equal => truth(l == r),
                BinaryOp::NotEqual => truth(l != r),
            }
        }
        Expr::Call { func, args } => call(*func, args)?,
    };

    if !value.is_finite() {
        return Err(format!("result {} is not a finite number", value));
    }
    Ok(value)
}

fn call(func: Function, args: &[Expr]) -> Result<f64, String> {
    match func {
        // Only the taken branch is evaluated, so IF(B == 0, 0, A / B) is safe.
        Function::If => {
            if evaluate(&args[0])? != 0.0 {
                evaluate(&args[1])
            } else {
                evaluate(&args[2])
            }
        }
        Function::Min => fold(args, f64::min),
        Function::Max => fold(args, f64::max),
        Function::Abs => Ok(evaluate(&args[0])?.abs()),
        Function::Round => {
            let x = evaluate(&args[0])?;
            let digits = match args.get(1) {
                Some(d) => evaluate(d)?,
                None => 0.0,
            };
            if digits.fract() != 0.0 {
                return Err(format!("ROUND digits must be a whole number, got {}", digits));
            }
            // Past f64's decimal range every digit is kept, or nothing survives.
            if digits > f64::MAX_10_EXP as f64 {
                return Ok(x);
            }
            if digits < -(f64::MAX_10_EXP as f64) {
                return Ok(0.0);
            }
            let scale = 10f64.powi(digits as i32);
            let scaled = x * scale;
            if !scaled.is_finite() {
                return Ok(x);
            }
            Ok(scaled.round() / scale)
        }
    }
}

fn fold(args: &[Expr], f: fn(f64, f64) -> f64) -> Result<f64, String> {
    let mut acc = evaluate(&args[0])?;
    for arg in &args[1..] {
        acc = f(acc, evaluate(arg)?);
    }
    Ok(acc)
}

#[inline]
fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
