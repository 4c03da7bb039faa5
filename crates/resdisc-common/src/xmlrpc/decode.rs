use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use serde_json::{Map, Number, Value};

use crate::error::{ResdiscError, Result};

/// Decodes an XML-RPC `<methodResponse>` document.
///
/// # Returns
///
/// The single result value, or `Value::Null` for an empty `<params>` block.
///
/// # Errors
///
/// - [`ResdiscError::Fault`] when the server answered with a `<fault>`
/// - [`ResdiscError::InvalidResponse`] when the document is not a well-formed
///   XML-RPC response
/// - [`ResdiscError::Xml`] for low-level XML syntax errors
pub fn decode_method_response(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    expect_root(&mut reader, "methodResponse")?;

    let value = match next_structural(&mut reader)? {
        Event::Start(e) if tag(e.name()) == "params" => {
            let value = read_params(&mut reader)?.into_iter().next();
            value.unwrap_or(Value::Null)
        }
        Event::Empty(e) if tag(e.name()) == "params" => Value::Null,
        Event::Start(e) if tag(e.name()) == "fault" => {
            expect_start(&mut reader, "value")?;
            let fault = parse_value(&mut reader)?;
            expect_end(&mut reader, "fault")?;
            return Err(fault_from_value(fault));
        }
        other => {
            return Err(unexpected(&other, "<params> or <fault>"));
        }
    };

    expect_end(&mut reader, "methodResponse")?;
    Ok(value)
}

/// Decodes an XML-RPC `<methodCall>` document into its method name and
/// positional parameters.
pub fn decode_method_call(xml: &str) -> Result<(String, Vec<Value>)> {
    let mut reader = Reader::from_str(xml);
    expect_root(&mut reader, "methodCall")?;

    expect_start(&mut reader, "methodName")?;
    let method = read_text(&mut reader, "methodName")?.trim().to_string();

    let params = match next_structural(&mut reader)? {
        Event::Start(e) if tag(e.name()) == "params" => {
            let params = read_params(&mut reader)?;
            expect_end(&mut reader, "methodCall")?;
            params
        }
        Event::Empty(e) if tag(e.name()) == "params" => {
            expect_end(&mut reader, "methodCall")?;
            Vec::new()
        }
        Event::End(e) if tag(e.name()) == "methodCall" => Vec::new(),
        other => return Err(unexpected(&other, "<params>")),
    };

    Ok((method, params))
}

/// Reads `<param><value>..</value></param>` entries up to `</params>`.
fn read_params(reader: &mut Reader<&[u8]>) -> Result<Vec<Value>> {
    let mut params = Vec::new();
    loop {
        match next_structural(reader)? {
            Event::Start(e) if tag(e.name()) == "param" => {
                expect_start(reader, "value")?;
                params.push(parse_value(reader)?);
                expect_end(reader, "param")?;
            }
            Event::End(e) if tag(e.name()) == "params" => return Ok(params),
            other => return Err(unexpected(&other, "<param>")),
        }
    }
}

/// Parses the contents of a `<value>` element. The opening tag has already
/// been consumed; the closing tag is consumed before returning.
fn parse_value(reader: &mut Reader<&[u8]>) -> Result<Value> {
    // Untyped content is a string
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(std::str::from_utf8(&c)?),
            Event::Start(e) => {
                let kind = tag(e.name());
                let value = parse_typed(reader, &kind)?;
                expect_end(reader, "value")?;
                return Ok(value);
            }
            Event::Empty(e) => {
                let value = empty_typed(&tag(e.name()))?;
                expect_end(reader, "value")?;
                return Ok(value);
            }
            Event::End(e) if tag(e.name()) == "value" => return Ok(Value::String(text)),
            Event::Comment(_) => {}
            other => return Err(unexpected(&other, "value content")),
        }
    }
}

fn parse_typed(reader: &mut Reader<&[u8]>, kind: &str) -> Result<Value> {
    match kind {
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(read_text(reader, kind)?)),
        "int" | "i4" | "i8" => {
            let raw = read_text(reader, kind)?;
            let n: i64 = raw.trim().parse().map_err(|_| {
                ResdiscError::InvalidResponse(format!("invalid <{}> value '{}'", kind, raw))
            })?;
            Ok(Value::Number(n.into()))
        }
        "boolean" => {
            let raw = read_text(reader, kind)?;
            match raw.trim() {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                other => Err(ResdiscError::InvalidResponse(format!(
                    "invalid <boolean> value '{}'",
                    other
                ))),
            }
        }
        "double" => {
            let raw = read_text(reader, kind)?;
            raw.trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| {
                    ResdiscError::InvalidResponse(format!("invalid <double> value '{}'", raw))
                })
        }
        "nil" => {
            read_text(reader, kind)?;
            Ok(Value::Null)
        }
        "struct" => parse_struct(reader),
        "array" => parse_array(reader),
        other => Err(ResdiscError::InvalidResponse(format!(
            "unknown value type <{}>",
            other
        ))),
    }
}

fn empty_typed(kind: &str) -> Result<Value> {
    match kind {
        "nil" => Ok(Value::Null),
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(String::new())),
        "struct" => Ok(Value::Object(Map::new())),
        "array" => Ok(Value::Array(Vec::new())),
        other => Err(ResdiscError::InvalidResponse(format!(
            "empty <{}/> is not a valid value",
            other
        ))),
    }
}

fn parse_struct(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let mut members = Map::new();
    loop {
        match next_structural(reader)? {
            Event::Start(e) if tag(e.name()) == "member" => {
                let (name, value) = parse_member(reader)?;
                members.insert(name, value);
            }
            Event::End(e) if tag(e.name()) == "struct" => return Ok(Value::Object(members)),
            other => return Err(unexpected(&other, "<member>")),
        }
    }
}

fn parse_member(reader: &mut Reader<&[u8]>) -> Result<(String, Value)> {
    let mut name = None;
    let mut value = None;
    loop {
        match next_structural(reader)? {
            Event::Start(e) if tag(e.name()) == "name" => {
                name = Some(read_text(reader, "name")?);
            }
            Event::Start(e) if tag(e.name()) == "value" => {
                value = Some(parse_value(reader)?);
            }
            Event::End(e) if tag(e.name()) == "member" => break,
            other => return Err(unexpected(&other, "<name> or <value>")),
        }
    }

    match (name, value) {
        (Some(name), Some(value)) => Ok((name, value)),
        (None, _) => Err(ResdiscError::InvalidResponse("<member> without <name>".into())),
        (_, None) => Err(ResdiscError::InvalidResponse("<member> without <value>".into())),
    }
}

fn parse_array(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let mut items = Vec::new();
    match next_structural(reader)? {
        Event::Start(e) if tag(e.name()) == "data" => loop {
            match next_structural(reader)? {
                Event::Start(e) if tag(e.name()) == "value" => items.push(parse_value(reader)?),
                Event::End(e) if tag(e.name()) == "data" => break,
                other => return Err(unexpected(&other, "<value>")),
            }
        },
        Event::Empty(e) if tag(e.name()) == "data" => {}
        other => return Err(unexpected(&other, "<data>")),
    }
    expect_end(reader, "array")?;
    Ok(Value::Array(items))
}

/// Turns a `<fault>` struct into [`ResdiscError::Fault`].
fn fault_from_value(fault: Value) -> ResdiscError {
    let code = fault.get("faultCode").and_then(Value::as_i64);
    let message = fault.get("faultString").and_then(Value::as_str);

    match (code, message) {
        (Some(code), Some(message)) => ResdiscError::Fault {
            code,
            message: message.to_string(),
        },
        _ => ResdiscError::InvalidResponse(format!("malformed fault: {}", fault)),
    }
}

/// Reads character data up to `</kind>`.
fn read_text(reader: &mut Reader<&[u8]>, kind: &str) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(std::str::from_utf8(&c)?),
            Event::End(e) if tag(e.name()) == kind => return Ok(text),
            Event::Comment(_) => {}
            other => return Err(unexpected(&other, &format!("text of <{}>", kind))),
        }
    }
}

fn expect_root(reader: &mut Reader<&[u8]>, root: &str) -> Result<()> {
    match next_structural(reader)? {
        Event::Start(e) if tag(e.name()) == root => Ok(()),
        other => Err(unexpected(&other, &format!("<{}>", root))),
    }
}

fn expect_start(reader: &mut Reader<&[u8]>, name: &str) -> Result<()> {
    match next_structural(reader)? {
        Event::Start(e) if tag(e.name()) == name => Ok(()),
        other => Err(unexpected(&other, &format!("<{}>", name))),
    }
}

fn expect_end(reader: &mut Reader<&[u8]>, name: &str) -> Result<()> {
    match next_structural(reader)? {
        Event::End(e) if tag(e.name()) == name => Ok(()),
        other => Err(unexpected(&other, &format!("</{}>", name))),
    }
}

/// Next event that carries document structure, skipping declarations,
/// comments and whitespace between elements.
fn next_structural<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>> {
    loop {
        match reader.read_event()? {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}
            event => return Ok(event),
        }
    }
}

fn tag(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn unexpected(event: &Event<'_>, expected: &str) -> ResdiscError {
    let found = match event {
        Event::Start(e) => format!("<{}>", tag(e.name())),
        Event::End(e) => format!("</{}>", tag(e.name())),
        Event::Empty(e) => format!("<{}/>", tag(e.name())),
        Event::Text(_) | Event::CData(_) => "text".to_string(),
        Event::Eof => "end of document".to_string(),
        _ => "markup".to_string(),
    };
    ResdiscError::InvalidResponse(format!("expected {}, found {}", expected, found))
}
