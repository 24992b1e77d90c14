//! Calculator tools: arithmetic expressions, scientific functions and unit conversion
//!
//! Results follow the shape the calculation validator expects: a `status` of `success`
//! or `error`, the `result` (null on error) and the echoed inputs.

use std::fmt;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

const ALLOWED_CHARS: &str = "0123456789+-*/()., ";

/// Parentheses, signs and exponents deeper than this are rejected before the stack runs out
const MAX_NESTING: usize = 100;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(\d+\.?\d*|\.\d+|\*\*|//|[-+*/()])").unwrap());

// ==================== Expression evaluation ====================

/// Integers stay integers until a true division or a float literal is involved
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn to_json(self) -> Value {
        match self {
            Number::Int(i) => json!(i),
            Number::Float(f) => json!(f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Op(&'static str),
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = expression;
    while !rest.trim().is_empty() {
        let captures = TOKEN
            .captures(rest)
            .filter(|c| c.get(0).is_some_and(|m| m.start() == 0))
            .ok_or_else(|| format!("unexpected input at '{}'", rest.trim()))?;
        let whole = captures.get(0).map(|m| m.end()).unwrap_or_default();
        let text = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let token = match text {
            "**" => Token::Op("**"),
            "//" => Token::Op("//"),
            "+" => Token::Op("+"),
            "-" => Token::Op("-"),
            "*" => Token::Op("*"),
            "/" => Token::Op("/"),
            "(" => Token::Op("("),
            ")" => Token::Op(")"),
            literal if literal.contains('.') => Token::Num(Number::Float(
                literal.parse().map_err(|_| format!("invalid number '{}'", literal))?,
            )),
            literal => Token::Num(Number::Int(
                literal.parse().map_err(|_| format!("number too large '{}'", literal))?,
            )),
        };
        tokens.push(token);
        rest = &rest[whole..];
    }
    Ok(tokens)
}

/// Recursive-descent parser over the usual precedence levels:
/// sum := term (('+' | '-') term)*
/// term := unary (('*' | '/' | '//') unary)*
/// unary := ('+' | '-') unary | power
/// power := atom ('**' unary)?
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn sum(&mut self) -> Result<Number, String> {
        let mut value = self.term()?;
        loop {
            if self.eat("+") {
                value = add(value, self.term()?)?;
            } else if self.eat("-") {
                value = subtract(value, self.term()?)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<Number, String> {
        let mut value = self.unary()?;
        loop {
            if self.eat("*") {
                value = multiply(value, self.unary()?)?;
            } else if self.eat("/") {
                value = divide(value, self.unary()?)?;
            } else if self.eat("//") {
                value = floor_divide(value, self.unary()?)?;
            } else {
                return Ok(value);
            }
        }
    }

    // Every recursive path of the grammar re-enters here
    fn unary(&mut self) -> Result<Number, String> {
        if self.depth >= MAX_NESTING {
            return Err("expression too deeply nested".to_string());
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<Number, String> {
        if self.eat("-") {
            return match self.unary()? {
                Number::Int(i) => i.checked_neg().map(Number::Int).ok_or_else(overflow),
                Number::Float(f) => Ok(Number::Float(-f)),
            };
        }
        if self.eat("+") {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Number, String> {
        let base = self.atom()?;
        if self.eat("**") {
            let exponent = self.unary()?;
            return power(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, String> {
        match self.peek().cloned() {
            Some(Token::Num(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Token::Op("(")) => {
                self.pos += 1;
                let value = self.sum()?;
                if !self.eat(")") {
                    return Err("missing closing parenthesis".to_string());
                }
                Ok(value)
            }
            Some(Token::Op(op)) => Err(format!("unexpected '{}'", op)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn overflow() -> String {
    "integer overflow".to_string()
}

fn add(a: Number, b: Number) -> Result<Number, String> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_add(y).map(Number::Int).ok_or_else(overflow),
        _ => Ok(Number::Float(a.as_f64() + b.as_f64())),
    }
}

fn subtract(a: Number, b: Number) -> Result<Number, String> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_sub(y).map(Number::Int).ok_or_else(overflow),
        _ => Ok(Number::Float(a.as_f64() - b.as_f64())),
    }
}

fn multiply(a: Number, b: Number) -> Result<Number, String> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_mul(y).map(Number::Int).ok_or_else(overflow),
        _ => Ok(Number::Float(a.as_f64() * b.as_f64())),
    }
}

fn divide(a: Number, b: Number) -> Result<Number, String> {
    if b.as_f64() == 0.0 {
        return Err("division by zero".to_string());
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

fn floor_divide(a: Number, b: Number) -> Result<Number, String> {
    if b.as_f64() == 0.0 {
        return Err("integer division or modulo by zero".to_string());
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let quotient = x.checked_div_euclid(y).ok_or_else(overflow)?;
            // Euclidean division rounds up for negative divisors, floor division never does
            Ok(Number::Int(quotient - i64::from(y < 0 && x.rem_euclid(y) != 0)))
        }
        _ => Ok(Number::Float((a.as_f64() / b.as_f64()).floor())),
    }
}

fn power(base: Number, exponent: Number) -> Result<Number, String> {
    match (base, exponent) {
        (Number::Int(b), Number::Int(e)) if e >= 0 => {
            let e = u32::try_from(e).map_err(|_| overflow())?;
            b.checked_pow(e).map(Number::Int).ok_or_else(overflow)
        }
        _ => {
            if base.as_f64() == 0.0 && exponent.as_f64() < 0.0 {
                return Err("0.0 cannot be raised to a negative power".to_string());
            }
            Ok(Number::Float(base.as_f64().powf(exponent.as_f64())))
        }
    }
}

fn evaluate(expression: &str) -> Result<Number, String> {
    if !expression.chars().all(|c| ALLOWED_CHARS.contains(c)) {
        return Err("Expression contains invalid characters".to_string());
    }
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.sum()?;
    if parser.pos != parser.tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    if !value.as_f64().is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

// ==================== Tools ====================

#[derive(Debug, Deserialize)]
struct BasicParams {
    expression: String,
}

/// Arithmetic over `+ - * / // **` and parentheses
pub struct BasicCalculatorTool;

#[async_trait]
impl Tool for BasicCalculatorTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("basic_calculator", "Perform basic arithmetic calculations").param(
            "expression",
            PropertySchema::string("Mathematical expression to evaluate, e.g. '(15 + 25) * 3'"),
            true,
        )
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: BasicParams = parse_params(params)?;
        log::info!("[TOOLS] Calculating expression: {}", params.expression);

        Ok(match evaluate(&params.expression) {
            Ok(result) => {
                log::info!("[TOOLS] Calculation successful: {} = {}", params.expression, result);
                json!({
                    "result": result.to_json(),
                    "expression": params.expression,
                    "type": "basic_arithmetic",
                    "status": "success",
                })
            }
            Err(e) => {
                log::error!("[TOOLS] Calculation failed: {} - {}", params.expression, e);
                json!({
                    "result": null,
                    "expression": params.expression,
                    "type": "basic_arithmetic",
                    "status": "error",
                    "error": e,
                })
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScientificParams {
    operation: String,
    #[serde(default)]
    arguments: Vec<f64>,
}

fn factorial(n: f64) -> Result<Number, String> {
    if n < 0.0 {
        return Err("factorial() not defined for negative values".to_string());
    }
    (1..=n.trunc() as i64)
        .try_fold(1i64, |acc, k| acc.checked_mul(k))
        .map(Number::Int)
        .ok_or_else(overflow)
}

fn scientific(operation: &str, args: &[f64]) -> Result<Number, String> {
    let domain = || "math domain error".to_string();
    let value = match (operation, args) {
        ("sin", [x]) => x.to_radians().sin(),
        ("cos", [x]) => x.to_radians().cos(),
        ("tan", [x]) => x.to_radians().tan(),
        ("log", [x]) if *x > 0.0 => x.log10(),
        ("ln", [x]) if *x > 0.0 => x.ln(),
        ("log" | "ln", [_]) => return Err(domain()),
        ("sqrt", [x]) if *x >= 0.0 => x.sqrt(),
        ("sqrt", [_]) => return Err(domain()),
        ("power", [b, e]) => b.powf(*e),
        ("factorial", [n]) => return factorial(*n),
        _ => {
            return Err(format!(
                "Unsupported operation: {} with {} arguments",
                operation,
                args.len()
            ));
        }
    };
    if !value.is_finite() {
        return Err(domain());
    }
    Ok(Number::Float(value))
}

/// sin/cos/tan (degrees), log, ln, sqrt, power and factorial
pub struct ScientificCalculatorTool;

#[async_trait]
impl Tool for ScientificCalculatorTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("scientific_calculator", "Perform scientific calculations")
            .param(
                "operation",
                PropertySchema::string("Scientific operation").with_enum(&[
                    "sin", "cos", "tan", "log", "ln", "sqrt", "power", "factorial",
                ]),
                true,
            )
            .param(
                "arguments",
                PropertySchema::array("Arguments for the operation", PropertySchema::number("Argument")),
                true,
            )
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: ScientificParams = parse_params(params)?;
        let operation = params.operation.to_lowercase();
        log::info!("[TOOLS] Scientific calculation: {} with args {:?}", operation, params.arguments);

        Ok(match scientific(&operation, &params.arguments) {
            Ok(result) => json!({
                "result": result.to_json(),
                "operation": operation,
                "arguments": params.arguments,
                "type": "scientific",
                "status": "success",
            }),
            Err(e) => {
                log::error!("[TOOLS] Scientific calculation failed: {}({:?}) - {}", operation, params.arguments, e);
                json!({
                    "result": null,
                    "operation": operation,
                    "arguments": params.arguments,
                    "type": "scientific",
                    "status": "error",
                    "error": e,
                })
            }
        })
    }
}

const LENGTH_FACTORS: [(&str, f64); 8] = [
    ("mm", 0.001),
    ("cm", 0.01),
    ("m", 1.0),
    ("km", 1000.0),
    ("inch", 0.0254),
    ("ft", 0.3048),
    ("yard", 0.9144),
    ("mile", 1609.34),
];

const WEIGHT_FACTORS: [(&str, f64); 4] = [("g", 1.0), ("kg", 1000.0), ("lb", 453.592), ("oz", 28.3495)];

const TEMPERATURE_UNITS: [&str; 3] = ["celsius", "fahrenheit", "kelvin"];

fn factor(table: &[(&str, f64)], unit: &str) -> Option<f64> {
    table.iter().find(|(name, _)| *name == unit).map(|(_, f)| *f)
}

fn to_celsius(value: f64, unit: &str) -> f64 {
    match unit {
        "fahrenheit" => (value - 32.0) * 5.0 / 9.0,
        "kelvin" => value - 273.15,
        _ => value,
    }
}

fn from_celsius(value: f64, unit: &str) -> f64 {
    match unit {
        "fahrenheit" => value * 9.0 / 5.0 + 32.0,
        "kelvin" => value + 273.15,
        _ => value,
    }
}

fn convert(value: f64, from: &str, to: &str) -> Result<(f64, &'static str), String> {
    for (table, unit_type) in [(&LENGTH_FACTORS[..], "length"), (&WEIGHT_FACTORS[..], "weight")] {
        if let (Some(f), Some(t)) = (factor(table, from), factor(table, to)) {
            return Ok((value * f / t, unit_type));
        }
    }
    if TEMPERATURE_UNITS.contains(&from) && TEMPERATURE_UNITS.contains(&to) {
        return Ok((from_celsius(to_celsius(value, from), to), "temperature"));
    }
    Err(format!("Unsupported conversion: {} to {}", from, to))
}

#[derive(Debug, Deserialize)]
struct ConversionParams {
    value: f64,
    from_unit: String,
    to_unit: String,
}

/// Length, weight and temperature conversion
pub struct UnitConverterTool;

#[async_trait]
impl Tool for UnitConverterTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("unit_converter", "Convert between different units")
            .param("value", PropertySchema::number("Value to convert"), true)
            .param("from_unit", PropertySchema::string("Source unit, e.g. 'km' or 'celsius'"), true)
            .param("to_unit", PropertySchema::string("Target unit, e.g. 'mile' or 'fahrenheit'"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: ConversionParams = parse_params(params)?;
        let from_unit = params.from_unit.to_lowercase();
        let to_unit = params.to_unit.to_lowercase();
        log::info!("[TOOLS] Converting {} from {} to {}", params.value, from_unit, to_unit);

        Ok(match convert(params.value, &from_unit, &to_unit) {
            Ok((result, unit_type)) => json!({
                "result": result,
                "original_value": params.value,
                "from_unit": from_unit,
                "to_unit": to_unit,
                "type": "unit_conversion",
                "unit_type": unit_type,
                "status": "success",
            }),
            Err(e) => json!({
                "result": null,
                "original_value": params.value,
                "from_unit": from_unit,
                "to_unit": to_unit,
                "type": "unit_conversion",
                "status": "error",
                "error": e,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_state;

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(evaluate("(15 + 25) * 3").unwrap(), Number::Int(120));
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), Number::Int(14));
        assert_eq!(evaluate("-2 ** 2").unwrap(), Number::Int(-4));
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), Number::Int(512));
        assert_eq!(evaluate("7 // 2").unwrap(), Number::Int(3));
        assert_eq!(evaluate("-7 // 2").unwrap(), Number::Int(-4));
    }

    #[test]
    fn test_division_is_float() {
        assert_eq!(evaluate("10 / 4").unwrap(), Number::Float(2.5));
        assert_eq!(evaluate("10 / 2").unwrap(), Number::Float(5.0));
        assert_eq!(evaluate("1.5 + 1").unwrap(), Number::Float(2.5));
    }

    #[test]
    fn test_evaluate_errors() {
        assert_eq!(evaluate("1 / 0").unwrap_err(), "division by zero");
        assert_eq!(
            evaluate("import os").unwrap_err(),
            "Expression contains invalid characters"
        );
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 +").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("1,2").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(evaluate(&nested).unwrap_err(), "expression too deeply nested");
        assert_eq!(
            evaluate(&format!("{}1", "-".repeat(50_000))).unwrap_err(),
            "expression too deeply nested"
        );
        assert_eq!(
            evaluate(&format!("1{}", " ** 1".repeat(50_000))).unwrap_err(),
            "expression too deeply nested"
        );

        let shallow = format!("{}7{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(evaluate(&shallow).unwrap(), Number::Int(7));
    }

    #[tokio::test]
    async fn test_deep_nesting_returns_error_payload() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let expression = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let result = BasicCalculatorTool
            .execute(json!({"expression": expression}), &context)
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "expression too deeply nested");
    }

    #[tokio::test]
    async fn test_basic_calculator_payloads() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = BasicCalculatorTool
            .execute(json!({"expression": "(15 + 25) * 3"}), &context)
            .await
            .unwrap();
        assert_eq!(result["result"], 120);
        assert_eq!(result["status"], "success");
        assert_eq!(result["type"], "basic_arithmetic");

        let result = BasicCalculatorTool
            .execute(json!({"expression": "5 / 0"}), &context)
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert!(result["result"].is_null());
        assert_eq!(result["error"], "division by zero");
    }

    #[tokio::test]
    async fn test_scientific_calculator() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = ScientificCalculatorTool
            .execute(json!({"operation": "SQRT", "arguments": [144]}), &context)
            .await
            .unwrap();
        assert_eq!(result["result"], 12.0);
        assert_eq!(result["operation"], "sqrt");

        let sin = scientific("sin", &[30.0]).unwrap().as_f64();
        assert!((sin - 0.5).abs() < 1e-12);
        assert_eq!(scientific("factorial", &[5.0]).unwrap(), Number::Int(120));
        assert_eq!(scientific("power", &[2.0, 10.0]).unwrap(), Number::Float(1024.0));
        assert_eq!(scientific("sqrt", &[-1.0]).unwrap_err(), "math domain error");

        let result = ScientificCalculatorTool
            .execute(json!({"operation": "power", "arguments": [2]}), &context)
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Unsupported operation: power with 1 arguments");
    }

    #[tokio::test]
    async fn test_unit_converter() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let result = UnitConverterTool
            .execute(json!({"value": 100, "from_unit": "Celsius", "to_unit": "fahrenheit"}), &context)
            .await
            .unwrap();
        assert_eq!(result["result"], 212.0);
        assert_eq!(result["unit_type"], "temperature");
        assert_eq!(result["from_unit"], "celsius");

        let (km, unit_type) = convert(1.0, "mile", "km").unwrap();
        assert!((km - 1.60934).abs() < 1e-9);
        assert_eq!(unit_type, "length");
        let (grams, _) = convert(2.0, "kg", "g").unwrap();
        assert_eq!(grams, 2000.0);

        let result = UnitConverterTool
            .execute(json!({"value": 1, "from_unit": "kg", "to_unit": "km"}), &context)
            .await
            .unwrap();
        assert_eq!(result["status"], "error");
        assert_eq!(result["error"], "Unsupported conversion: kg to km");
    }
}
