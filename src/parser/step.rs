use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integers are accepted where reals are expected, as STEP writers
    /// often drop the decimal point.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StepValue::Real(f) => Some(*f),
            StepValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(list) => Some(list),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    /// Upper-case entity name as written in the file, e.g. `IFCWALL`.
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    /// Non-empty string attribute at `index`.
    #[must_use]
    pub fn string(&self, index: usize) -> Option<&str> {
        self.values
            .get(index)
            .and_then(StepValue::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn real(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(StepValue::as_f64)
    }

    #[must_use]
    pub fn reference(&self, index: usize) -> Option<u64> {
        self.values.get(index).and_then(StepValue::as_reference)
    }

    /// All references in the list attribute at `index`; empty when the
    /// attribute is missing or not a list.
    #[must_use]
    pub fn references(&self, index: usize) -> Vec<u64> {
        self.values
            .get(index)
            .and_then(StepValue::as_list)
            .map(|list| list.iter().filter_map(StepValue::as_reference).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_type(&self, entity_type: &str) -> bool {
        self.entity_type.eq_ignore_ascii_case(entity_type)
    }
}

/// Fields of the `FILE_NAME` header record.
#[derive(Debug, Clone, Default)]
pub struct StepHeader {
    pub name: Option<String>,
    pub time_stamp: Option<String>,
    pub preprocessor_version: Option<String>,
    pub originating_system: Option<String>,
}

#[derive(Debug)]
pub struct StepFile {
    pub schema: String,
    pub header: StepHeader,
    entities: HashMap<u64, StepEntity>,
    by_type: HashMap<String, Vec<u64>>,
    /// Data statements that could not be decoded.
    pub skipped: usize,
}

const MAGIC: &str = "ISO-10303-21";

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let body = content.trim_start_matches('\u{feff}').trim_start();
        if !body.starts_with(MAGIC) {
            return Err(ParseError::InvalidStep {
                message: format!("missing {MAGIC} signature"),
            });
        }

        let mut file = StepFile {
            schema: String::new(),
            header: StepHeader::default(),
            entities: HashMap::new(),
            by_type: HashMap::new(),
            skipped: 0,
        };
        let mut in_data = false;
        let mut saw_end = false;

        for statement in split_statements(body) {
            let statement = statement.trim();

            if statement.starts_with("FILE_SCHEMA") {
                file.schema = first_string(statement).unwrap_or_default();
            } else if statement.starts_with("FILE_NAME") {
                file.header = parse_file_name(statement);
            } else if statement == "DATA" {
                in_data = true;
            } else if statement == "ENDSEC" {
                in_data = false;
            } else if statement.starts_with("END-ISO-10303-21") {
                saw_end = true;
            } else if in_data && statement.starts_with('#') {
                match parse_entity(statement) {
                    Some(entity) => file.insert(entity),
                    None => file.skipped += 1,
                }
            }
        }

        if !saw_end {
            return Err(ParseError::InvalidStep {
                message: "file is truncated (no END-ISO-10303-21)".to_string(),
            });
        }

        for ids in file.by_type.values_mut() {
            ids.sort_unstable();
        }

        Ok(file)
    }

    fn insert(&mut self, entity: StepEntity) {
        self.by_type
            .entry(entity.entity_type.clone())
            .or_default()
            .push(entity.id);
        self.entities.insert(entity.id, entity);
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Entities of the given type in id order. The name is matched
    /// case-insensitively.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.by_type
            .get(&entity_type.to_ascii_uppercase())
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Split the exchange structure on `;`, ignoring separators inside string
/// literals. `/* */` comments are removed wherever they appear.
fn split_statements(content: &str) -> Vec<Cow<'_, str>> {
    let bytes = content.as_bytes();
    let mut statements = Vec::new();
    // Text of the current statement seen before a comment inside it.
    let mut stripped: Option<String> = None;
    let mut start = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'*') => {
                let end = content[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |pos| i + 2 + pos + 2);
                let head = &content[start..i];
                match &mut stripped {
                    Some(text) => text.push_str(head),
                    None if head.trim().is_empty() => {}
                    None => stripped = Some(head.to_string()),
                }
                start = end;
                i = end;
                continue;
            }
            b';' if !in_string => {
                let tail = &content[start..i];
                statements.push(match stripped.take() {
                    Some(mut text) => {
                        text.push_str(tail);
                        Cow::Owned(text)
                    }
                    None => Cow::Borrowed(tail),
                });
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    statements
}

fn first_string(statement: &str) -> Option<String> {
    let start = statement.find('\'')?;
    let end = statement[start + 1..].find('\'')?;
    Some(statement[start + 1..start + 1 + end].to_string())
}

fn parse_file_name(statement: &str) -> StepHeader {
    let Some(open) = statement.find('(') else {
        return StepHeader::default();
    };
    let inner = statement[open + 1..].trim_end();
    let values = parse_values(inner.strip_suffix(')').unwrap_or(inner));
    let text = |index: usize| -> Option<String> {
        values
            .get(index)
            .and_then(StepValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    StepHeader {
        name: text(0),
        time_stamp: text(1),
        preprocessor_version: text(4),
        originating_system: text(5),
    }
}

fn parse_entity(statement: &str) -> Option<StepEntity> {
    // Format: #123=IFCWALL('guid',#ref,'name',...)
    let eq_pos = statement.find('=')?;
    let id: u64 = statement[1..eq_pos].trim().parse().ok()?;

    let rest = statement[eq_pos + 1..].trim();
    let paren_pos = rest.find('(')?;
    let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();
    if entity_type.is_empty() || !rest.ends_with(')') {
        return None;
    }

    let values = parse_values(&rest[paren_pos + 1..rest.len() - 1]);

    Some(StepEntity {
        id,
        entity_type,
        values,
    })
}

fn parse_values(s: &str) -> Vec<StepValue> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut depth = 0usize;

    for ch in s.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '(' if !in_string => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if !in_string && depth == 0 => {
                values.push(parse_single_value(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        values.push(parse_single_value(&current));
    }

    values
}

fn parse_single_value(s: &str) -> StepValue {
    let s = s.trim();

    match s {
        "$" => return StepValue::Null,
        "*" => return StepValue::Derived,
        _ => {}
    }
    if let Some(id) = s.strip_prefix('#').and_then(|r| r.parse::<u64>().ok()) {
        return StepValue::Reference(id);
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return StepValue::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
        return match &s[1..s.len() - 1] {
            "T" => StepValue::Boolean(true),
            "F" => StepValue::Boolean(false),
            other => StepValue::Enum(other.to_string()),
        };
    }
    if s.starts_with('(') && s.ends_with(')') {
        return StepValue::List(parse_values(&s[1..s.len() - 1]));
    }
    if let Ok(i) = s.parse::<i64>() {
        return StepValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return StepValue::Real(f);
    }
    // Typed value like IFCLABEL('x') or IFCBOOLEAN(.T.)
    if let (Some(open), true) = (s.find('('), s.ends_with(')')) {
        return parse_single_value(&s[open + 1..s.len() - 1]);
    }

    StepValue::String(s.to_string())
}

/// Decode STEP string escapes:
/// - `\X2\XXXX\X0\` - UTF-16 code units, four hex digits each
/// - `\X\XX` - one ISO 8859-1 byte
/// - `\S\c` - ISO 8859-1 high half shift
/// - `\\` and `''` - escaped backslash and apostrophe
fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.peek().copied() {
                Some('X') => {
                    chars.next();
                    match chars.peek().copied() {
                        Some('2') => {
                            chars.next();
                            chars.next(); // '\'
                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // Skip the \X0\ terminator.
                            for _ in 0..4 {
                                chars.next();
                            }
                            let units: Vec<u16> = hex
                                .as_bytes()
                                .chunks(4)
                                .filter_map(|chunk| std::str::from_utf8(chunk).ok())
                                .filter_map(|digits| u16::from_str_radix(digits, 16).ok())
                                .collect();
                            result.extend(
                                char::decode_utf16(units)
                                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
                            );
                        }
                        Some('\\') => {
                            chars.next();
                            let hex: String = chars.by_ref().take(2).collect();
                            if let Ok(code) = u8::from_str_radix(&hex, 16) {
                                result.push(char::from(code));
                            }
                        }
                        _ => result.push_str("\\X"),
                    }
                }
                Some('\\') => {
                    chars.next();
                    result.push('\\');
                }
                Some('S') => {
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        let code = u32::from(c) + 128;
                        result.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                }
                _ => result.push('\\'),
            },
            '\'' => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                }
                result.push('\'');
            }
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('house.ifc','2024-03-01T10:00:00',('Jane'),('ACME'),'IfcOpenShell 0.7','Revit 2024','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
/* a comment; with a separator */
#1=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',$,'Wall; north',$,$,#2,$,'W1',.STANDARD.);
#2=IFCLOCALPLACEMENT($,#3);
#3=IFCAXIS2PLACEMENT3D(#4,$,$);
#4=IFCCARTESIANPOINT((0.,1.5,-2.));
#5=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#6=IFCWALL('x',$,'Multi
line',$,$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn parses_header_and_entities() {
        let file = StepFile::parse(SAMPLE).unwrap();

        assert_eq!(file.schema, "IFC4");
        assert_eq!(file.header.originating_system.as_deref(), Some("Revit 2024"));
        assert_eq!(file.header.preprocessor_version.as_deref(), Some("IfcOpenShell 0.7"));
        assert_eq!(file.len(), 6);

        let wall = file.get_entity(1).unwrap();
        assert_eq!(wall.entity_type, "IFCWALL");
        assert_eq!(wall.string(2), Some("Wall; north"));
        assert_eq!(wall.reference(5), Some(2));
        assert_eq!(wall.values[8], StepValue::Enum("STANDARD".into()));

        let point = file.get_entity(4).unwrap();
        assert_eq!(
            point.values[0],
            StepValue::List(vec![
                StepValue::Real(0.0),
                StepValue::Real(1.5),
                StepValue::Real(-2.0)
            ])
        );

        let prop = file.get_entity(5).unwrap();
        assert_eq!(prop.values[2], StepValue::Boolean(true));

        assert_eq!(file.get_entity(6).unwrap().string(2), Some("Multi\nline"));
    }

    #[test]
    fn by_type_is_case_insensitive_and_ordered() {
        let file = StepFile::parse(SAMPLE).unwrap();
        let ids: Vec<u64> = file
            .get_entities_by_type("IfcWall")
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 6]);
    }

    #[test]
    fn comments_inside_statements_are_removed() {
        let content = SAMPLE.replace(
            "#4=IFCCARTESIANPOINT((0.,1.5,-2.));",
            "#4=IFCCARTESIANPOINT(/* origin; shifted */(0.,1.5,-2.));\n#7=IFCWALL('y' /* tag */,$,'Core');",
        );
        let file = StepFile::parse(&content).unwrap();

        assert_eq!(file.skipped, 0);
        assert_eq!(
            file.get_entity(4).unwrap().values[0],
            StepValue::List(vec![
                StepValue::Real(0.0),
                StepValue::Real(1.5),
                StepValue::Real(-2.0)
            ])
        );
        let wall = file.get_entity(7).unwrap();
        assert_eq!(wall.string(0), Some("y"));
        assert_eq!(wall.values[1], StepValue::Null);
        assert_eq!(wall.string(2), Some("Core"));
    }

    #[test]
    fn rejects_non_step_content() {
        let err = StepFile::parse("PK\u{3}\u{4} not a step file").unwrap_err();
        assert!(err.to_string().contains("ISO-10303-21"));
    }

    #[test]
    fn rejects_truncated_file() {
        let truncated = &SAMPLE[..SAMPLE.find("#5=").unwrap()];
        assert!(StepFile::parse(truncated).is_err());
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(decode_step_string(r"Stra\X2\00DF\X0\e"), "Straße");
        assert_eq!(decode_step_string(r"caf\X\E9"), "café");
        assert_eq!(decode_step_string("it''s"), "it's");
        assert_eq!(decode_step_string(r"a\\b"), "a\\b");
    }
}
