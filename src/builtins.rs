//! The standard library every environment starts with.

use std::cmp::Ordering;

use rand::{Rng, seq::SliceRandom};
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use tracing::warn;

use crate::{
    environment::{BuiltinsRef, Environment},
    evaluator::{evaluate, step_count},
    value::{Value, parse_number},
};

/// Longest array `range` will build.
const MAX_RANGE_LEN: u64 = 1 << 24;

type Builtin = fn(Vec<Value>) -> Value;

const STDLIB: &[(&str, Builtin)] = &[
    ("abs", abs),
    ("len", len),
    ("str", to_str),
    ("num", num),
    ("round", round),
    ("floor", floor),
    ("ceil", ceil),
    ("max", max),
    ("min", min),
    ("sum", sum),
    ("rand", random),
    ("randint", randint),
    ("map", map),
    ("filter", filter),
    ("sort", sort),
    ("slice", slice),
    ("shuf", shuf),
    ("randitem", randitem),
    ("reverse", reverse),
    ("join", join),
    ("split", split),
    ("keys", keys),
    ("get", get),
    ("set", set),
    ("range", range),
    ("type", type_of),
];

pub fn register_stdlib(env: &mut Environment) {
    for (name, func) in STDLIB {
        env.register_builtin(name, *func);
    }
    let scope = env.builtins_ref();
    env.register_builtin("eval", move |args| eval(args, &scope));
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Number(0.0))
}

fn number(args: &[Value], i: usize) -> f64 {
    args.get(i).map_or(0.0, Value::to_number)
}

/// Arguments as numbers, with array arguments spread: `max([1, 5], 3)`.
fn spread_numbers(args: &[Value]) -> Vec<f64> {
    args.iter()
        .flat_map(|a| match a {
            Value::Array(_) => a.items(),
            other => vec![other.clone()],
        })
        .map(|v| v.to_number())
        .collect()
}

/// Resolves a possibly negative index against `len`, clamping like slicing
/// does.
fn resolve_index(index: f64, len: usize) -> usize {
    let len_f = len as f64;
    let i = if index < 0.0 { len_f + index } else { index };
    i.clamp(0.0, len_f) as usize
}

fn abs(args: Vec<Value>) -> Value {
    Value::Number(number(&args, 0).abs())
}

fn len(args: Vec<Value>) -> Value {
    Value::Number(arg(&args, 0).len() as f64)
}

fn to_str(args: Vec<Value>) -> Value {
    Value::String(arg(&args, 0).to_string())
}

fn num(args: Vec<Value>) -> Value {
    Value::Number(number(&args, 0))
}

/// `round(x)` rounds half away from zero; `round(x, places)` keeps that many
/// decimal places.
fn round(args: Vec<Value>) -> Value {
    let n = number(&args, 0);
    let places = number(&args, 1).max(0.0) as u32;

    let rounded = Decimal::from_f64(n)
        .map(|d| d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| {
            let scale = 10f64.powi(places as i32);
            (n * scale).round() / scale
        });
    Value::Number(rounded)
}

fn floor(args: Vec<Value>) -> Value {
    Value::Number(number(&args, 0).floor())
}

fn ceil(args: Vec<Value>) -> Value {
    Value::Number(number(&args, 0).ceil())
}

fn max(args: Vec<Value>) -> Value {
    Value::Number(
        spread_numbers(&args)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max),
    )
}

fn min(args: Vec<Value>) -> Value {
    Value::Number(spread_numbers(&args).into_iter().fold(f64::INFINITY, f64::min))
}

fn sum(args: Vec<Value>) -> Value {
    Value::Number(spread_numbers(&args).into_iter().sum())
}

fn random(_args: Vec<Value>) -> Value {
    Value::Number(rand::thread_rng().gen_range(0.0..1.0))
}

/// Integer in `[low, high)`.
fn randint(args: Vec<Value>) -> Value {
    let low = number(&args, 0).floor();
    let high = number(&args, 1).floor();
    if !(low.is_finite() && high.is_finite()) {
        warn!("randint: bounds {} to {} are not finite", low, high);
        return Value::Number(0.0);
    }
    if !(low < high) {
        warn!("randint: empty range {} to {}", low, high);
        return Value::Number(low);
    }
    Value::Number(rand::thread_rng().gen_range(low..high).floor())
}

fn map(args: Vec<Value>) -> Value {
    let func = arg(&args, 1);
    Value::array(
        arg(&args, 0)
            .items()
            .into_iter()
            .map(|item| func.call(vec![item]))
            .collect(),
    )
}

fn filter(args: Vec<Value>) -> Value {
    let func = arg(&args, 1);
    Value::array(
        arg(&args, 0)
            .items()
            .into_iter()
            .filter(|item| func.call(vec![item.clone()]).is_truthy())
            .collect(),
    )
}

fn compare(a: &Value, b: &Value) -> Ordering {
    if a.less_than(b).is_truthy() {
        Ordering::Less
    } else if a.greater_than(b).is_truthy() {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Stable sort, by the values themselves or by `key(item)`.
fn sort(args: Vec<Value>) -> Value {
    let items = arg(&args, 0).items();

    let mut keyed: Vec<(Value, Value)> = match args.get(1) {
        Some(key) => items
            .into_iter()
            .map(|item| (key.call(vec![item.clone()]), item))
            .collect(),
        None => items.into_iter().map(|item| (item.clone(), item)).collect(),
    };
    keyed.sort_by(|a, b| compare(&a.0, &b.0));

    Value::array(keyed.into_iter().map(|(_, item)| item).collect())
}

/// `slice(xs, start, end?)`; negative positions count from the end.
fn slice(args: Vec<Value>) -> Value {
    let target = arg(&args, 0);
    let len = target.len();
    let start = resolve_index(number(&args, 1), len);
    let end = args
        .get(2)
        .map_or(len, |end| resolve_index(end.to_number(), len));
    let end = end.max(start);

    match &target {
        Value::String(s) => Value::String(s.chars().skip(start).take(end - start).collect()),
        _ => Value::array(target.items()[start..end].to_vec()),
    }
}

fn shuf(args: Vec<Value>) -> Value {
    let mut items = arg(&args, 0).items();
    items.shuffle(&mut rand::thread_rng());
    Value::array(items)
}

fn randitem(args: Vec<Value>) -> Value {
    let items = arg(&args, 0).items();
    match items.choose(&mut rand::thread_rng()) {
        Some(item) => item.clone(),
        None => {
            warn!("randitem: nothing to choose from");
            Value::Number(0.0)
        }
    }
}

fn reverse(args: Vec<Value>) -> Value {
    match arg(&args, 0) {
        Value::String(s) => Value::String(s.chars().rev().collect()),
        other => {
            let mut items = other.items();
            items.reverse();
            Value::array(items)
        }
    }
}

fn join(args: Vec<Value>) -> Value {
    let separator = args.get(1).map(Value::to_string).unwrap_or_default();
    let parts: Vec<String> = arg(&args, 0).items().iter().map(Value::to_string).collect();
    Value::String(parts.join(&separator))
}

fn split(args: Vec<Value>) -> Value {
    let text = arg(&args, 0).to_string();
    let separator = args.get(1).map(Value::to_string).unwrap_or_default();

    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::from).collect()
    };
    Value::array(parts)
}

fn keys(args: Vec<Value>) -> Value {
    let target = arg(&args, 0);
    let mut names: Vec<String> = match &target {
        Value::Object(map) => map.borrow().keys().cloned().collect(),
        Value::Entry(entry) => entry.field_names(),
        other => (0..other.len()).map(|i| i.to_string()).collect(),
    };
    names.sort();
    Value::array(names.into_iter().map(Value::String).collect())
}

fn get(args: Vec<Value>) -> Value {
    arg(&args, 0).get_attribute(&arg(&args, 1))
}

fn set(args: Vec<Value>) -> Value {
    arg(&args, 0).set_attribute(&arg(&args, 1), arg(&args, 2))
}

/// Runs code: a code value is called with the remaining arguments, a string
/// is parsed and evaluated over the built-ins of the registering environment.
fn eval(mut args: Vec<Value>, scope: &BuiltinsRef) -> Value {
    if args.is_empty() {
        return Value::Number(0.0);
    }
    let target = args.remove(0);
    match target {
        Value::Code(_) | Value::Function(_) => target.call(args),
        Value::String(source) => evaluate(&source, &mut scope.fresh()),
        other => other,
    }
}

/// `range(end)` or `range(start, end)`, counting up by one.
fn range(args: Vec<Value>) -> Value {
    let (start, end) = match args.len() {
        0 | 1 => (0.0, number(&args, 0)),
        _ => (number(&args, 0), number(&args, 1)),
    };

    let count = step_count(start, end);
    if count > MAX_RANGE_LEN {
        warn!("range: {} elements is too many", count);
        return Value::array(Vec::new());
    }
    Value::array(
        (0..count)
            .map(|step| Value::Number(start + step as f64))
            .collect(),
    )
}

fn type_of(args: Vec<Value>) -> Value {
    Value::from(arg(&args, 0).type_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(ns: &[f64]) -> Value {
        Value::array(ns.iter().map(|n| Value::Number(*n)).collect())
    }

    #[test]
    fn round_keeps_requested_places() {
        assert_eq!(round(vec![2.5.into()]), Value::Number(3.0));
        assert_eq!(round(vec![(-2.5).into()]), Value::Number(-3.0));
        assert_eq!(round(vec![1.23456.into(), 2.0.into()]), Value::Number(1.23));
    }

    #[test]
    fn slice_counts_negative_positions_from_the_end() {
        let xs = nums(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(slice(vec![xs.clone(), 1.0.into(), 3.0.into()]), nums(&[2.0, 3.0]));
        assert_eq!(slice(vec![xs.clone(), (-2.0).into()]), nums(&[3.0, 4.0]));
        assert_eq!(slice(vec![xs, 3.0.into(), 1.0.into()]), nums(&[]));
        assert_eq!(slice(vec!["hello".into(), 1.0.into(), 3.0.into()]), Value::from("el"));
    }

    #[test]
    fn max_and_min_spread_arrays() {
        assert_eq!(max(vec![nums(&[1.0, 5.0]), 3.0.into()]), Value::Number(5.0));
        assert_eq!(min(vec![nums(&[1.0, 5.0]), 3.0.into()]), Value::Number(1.0));
        assert_eq!(sum(vec![nums(&[1.0, 5.0]), 3.0.into()]), Value::Number(9.0));
    }

    #[test]
    fn randint_stays_in_range() {
        for _ in 0..50 {
            let n = randint(vec![2.0.into(), 5.0.into()]).to_number();
            assert!((2.0..5.0).contains(&n) && n.fract() == 0.0, "{}", n);
        }
    }

    #[test]
    fn randint_refuses_infinite_bounds() {
        let inf = Value::Number(f64::INFINITY);
        assert_eq!(randint(vec![(-f64::INFINITY).into(), 0.0.into()]), Value::Number(0.0));
        assert_eq!(randint(vec![0.0.into(), inf]), Value::Number(0.0));
        assert_eq!(randint(vec![f64::NAN.into(), 3.0.into()]), Value::Number(0.0));
    }

    #[test]
    fn range_counts_past_exact_integers() {
        let big = 9007199254740992.0;
        assert_eq!(range(vec![big.into(), (big + 2.0).into()]).len(), 2);
        assert_eq!(range(vec![1e18.into()]), nums(&[]));
        assert_eq!(range(vec![0.5.into(), 2.0.into()]), nums(&[0.5, 1.5]));
    }

    #[test]
    fn eval_sees_registered_builtins() {
        let mut env = Environment::new();
        env.register_builtin("double", |args| Value::Number(args[0].to_number() * 2.0));
        assert_eq!(evaluate("eval(\"double(4)\")", &mut env), Value::Number(8.0));
    }

    #[test]
    fn text_helpers() {
        assert_eq!(
            join(vec![Value::array(vec!["a".into(), "b".into()]), ", ".into()]),
            Value::from("a, b")
        );
        assert_eq!(split(vec!["a,b".into(), ",".into()]).len(), 2);
        assert_eq!(num(vec![Value::from(" 7 ")]), Value::Number(parse_number("7")));
    }
}
