use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    static ref DIGIT_PATTERN: Regex = Regex::new(r"^digit:(\d+)$").unwrap();
    static ref NUMBER_RANGE_PATTERN: Regex = Regex::new(r"^number:(\d+):(\d+)$").unwrap();
    static ref HASH_PATTERN: Regex = Regex::new(r"^hash(:(\d+))?$").unwrap();
}

const HASH_DEFAULT_LENGTH: usize = 6;
const HASH_FIRST_CHARACTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const HASH_CHARACTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone)]
enum PatternComponent {
    Constant(String),
    Digit { length: usize, current: i64, max: i64 },
    NumberRange { min: i64, max: i64, width: usize, current: i64 },
    Hash { length: usize, current: String },
}

impl PatternComponent {
    fn is_generated(&self) -> bool {
        !matches!(self, PatternComponent::Constant(_))
    }

    fn reset(&mut self) {
        match self {
            PatternComponent::Digit { current, .. } => *current = 0,
            // One below minimum, the first advance yields the minimum.
            PatternComponent::NumberRange { min, current, .. } => *current = *min - 1,
            PatternComponent::Hash { .. } | PatternComponent::Constant(_) => {}
        }
    }

    fn advance(&mut self) {
        match self {
            PatternComponent::Digit { current, .. } => *current += 1,
            PatternComponent::NumberRange { current, .. } => *current += 1,
            PatternComponent::Hash { length, current } => {
                let mut rng = rand::rng();
                let mut value = String::with_capacity(*length);
                value.push(HASH_FIRST_CHARACTERS[rng.random_range(0..HASH_FIRST_CHARACTERS.len())] as char);
                for _ in 1..*length {
                    value.push(HASH_CHARACTERS[rng.random_range(0..HASH_CHARACTERS.len())] as char);
                }
                *current = value;
            }
            PatternComponent::Constant(_) => {}
        }
    }

    fn is_available(&self) -> bool {
        match self {
            PatternComponent::Digit { current, max, .. } => current <= max,
            PatternComponent::NumberRange { current, max, .. } => current <= max,
            PatternComponent::Hash { .. } | PatternComponent::Constant(_) => true,
        }
    }

    fn value(&self) -> String {
        match self {
            PatternComponent::Constant(constant) => constant.clone(),
            PatternComponent::Digit { length, current, .. } => format!("{:0width$}", current, width = *length),
            PatternComponent::NumberRange { width, current, .. } => format!("{:0width$}", current, width = *width),
            PatternComponent::Hash { current, .. } => current.clone(),
        }
    }

    fn regex(&self) -> String {
        match self {
            PatternComponent::Constant(constant) => regex::escape(constant),
            PatternComponent::Digit { length, .. } => format!(r"(\d{{{}}})", length),
            PatternComponent::NumberRange { max, width, .. } => {
                let max_width = max.to_string().len().max(*width);
                format!(r"(\d{{{},{}}})", width, max_width)
            }
            PatternComponent::Hash { length, .. } => format!(r"([a-zA-Z][a-zA-Z0-9_-]{{{}}})", length - 1),
        }
    }

    fn is_value_valid(&self, value: &str) -> bool {
        match self {
            PatternComponent::NumberRange { min, max, .. } => match value.parse::<i64>() {
                Ok(parsed) => parsed >= *min && parsed <= *max,
                Err(_) => false,
            },
            _ => true,
        }
    }
}

/// Value generator and validator built from a textual pattern.
///
/// Supported components are `{digit:N}` (N digits, 1 to 10), `{number:MIN:MAX}` (padded to
/// the length of `MIN`), `{hash}`/`{hash:N}` (random identifier starting with a letter) and
/// constant text between them. Values are generated like an odometer, the rightmost
/// component changes fastest.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    components: Vec<PatternComponent>,
    single_value: bool,
    generated_count: usize,
    exhausted: bool,
    validator: Regex,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Pattern> {
        let mut components = Vec::new();
        let mut rest = pattern;

        while let (Some(start), Some(end)) = (rest.find('{'), rest.find('}')) {
            if end < start {
                return Err(Error::InvalidPattern(format!("Unbalanced braces in '{}'.", pattern)));
            }
            if start > 0 {
                components.push(PatternComponent::Constant(rest[..start].to_string()));
            }
            let component = &rest[start + 1..end];
            components.push(Pattern::parse_component(component)?);
            rest = &rest[end + 1..];
        }
        if !rest.is_empty() {
            components.push(PatternComponent::Constant(rest.to_string()));
        }

        let single_value = components.len() == 1 && !components[0].is_generated();
        let expression = format!("^{}$", components.iter().map(|component| component.regex()).collect::<String>());
        let validator = Regex::new(&expression).map_err(|e| Error::InvalidPattern(format!("'{}': {}", pattern, e)))?;

        let mut parsed = Pattern { source: pattern.to_string(), components, single_value, generated_count: 0, exhausted: false, validator };
        parsed.reset();
        Ok(parsed)
    }

    fn parse_component(component: &str) -> Result<PatternComponent> {
        if let Some(captures) = DIGIT_PATTERN.captures(component) {
            let length: usize = captures[1].parse().map_err(|_| Error::InvalidPattern(component.to_string()))?;
            if !(1..=10).contains(&length) {
                return Err(Error::InvalidPattern("Length of number component should be in range from 1 to 10.".to_string()));
            }
            let max = 10i64.pow(length as u32) - 1;
            return Ok(PatternComponent::Digit { length, current: 0, max });
        }
        if let Some(captures) = NUMBER_RANGE_PATTERN.captures(component) {
            let min: i64 = captures[1].parse().map_err(|_| Error::InvalidPattern(component.to_string()))?;
            let max: i64 = captures[2].parse().map_err(|_| Error::InvalidPattern(component.to_string()))?;
            if min > max {
                return Err(Error::InvalidPattern("Min value cannot be greater than max value.".to_string()));
            }
            return Ok(PatternComponent::NumberRange { min, max, width: captures[1].len(), current: min - 1 });
        }
        if let Some(captures) = HASH_PATTERN.captures(component) {
            let length = match captures.get(2) {
                Some(length) => length.as_str().parse().map_err(|_| Error::InvalidPattern(component.to_string()))?,
                None => HASH_DEFAULT_LENGTH,
            };
            if length == 0 {
                return Err(Error::InvalidPattern("Hash length must be greater than zero.".to_string()));
            }
            return Ok(PatternComponent::Hash { length, current: String::new() });
        }
        Err(Error::InvalidPattern(format!("Component '{{{}}}' is in wrong format.", component)))
    }

    pub fn get_source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern produces an unbounded (random) sequence of values.
    pub fn is_unbounded(&self) -> bool {
        self.components.iter().any(|component| matches!(component, PatternComponent::Hash { .. }))
    }

    pub fn reset(&mut self) {
        self.generated_count = 0;
        self.exhausted = false;
        for component in self.components.iter_mut() {
            component.reset();
        }
    }

    /// Returns the next value, or `None` when the pattern is exhausted.
    pub fn generate(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }

        if self.generated_count == 0 {
            for component in self.components.iter_mut().filter(|component| component.is_generated()) {
                component.reset();
                component.advance();
                if !component.is_available() {
                    self.exhausted = true;
                    return None;
                }
            }
        } else {
            let mut carry = true;
            for component in self.components.iter_mut().rev().filter(|component| component.is_generated()) {
                component.advance();
                if component.is_available() {
                    carry = false;
                    break;
                }
                component.reset();
                component.advance();
            }
            if carry {
                self.exhausted = true;
                return None;
            }
        }

        self.generated_count += 1;
        Some(self.components.iter().map(|component| component.value()).collect())
    }

    /// Whether `value` could have been generated by this pattern.
    pub fn is_value_valid(&self, value: &str) -> bool {
        let captures = match self.validator.captures(value) {
            Some(captures) => captures,
            None => return false,
        };
        let mut group = 1;
        for component in self.components.iter().filter(|component| component.is_generated()) {
            let matched = match captures.get(group) {
                Some(matched) => matched.as_str(),
                None => return false,
            };
            if !component.is_value_valid(matched) {
                return false;
            }
            group += 1;
        }
        true
    }
}
