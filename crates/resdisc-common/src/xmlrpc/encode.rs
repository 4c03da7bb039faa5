use quick_xml::escape::escape;
use serde_json::{Number, Value};

use crate::error::{ResdiscError, Result};

/// Serializes an XML-RPC `<methodCall>` document.
///
/// # Arguments
///
/// * `method` - Name placed in `<methodName>`
/// * `params` - Positional parameters, each wrapped in its own `<param>`
///
/// # Errors
///
/// Returns [`ResdiscError::InvalidRequest`] for integers that do not fit in
/// an XML-RPC `<int>` (32-bit signed).
pub fn encode_method_call(method: &str, params: &[Value]) -> Result<String> {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out)?;
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    Ok(out)
}

/// Serializes a successful `<methodResponse>` carrying `value`.
pub fn encode_method_response(value: &Value) -> Result<String> {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>\n<methodResponse><params><param>");
    encode_value(value, &mut out)?;
    out.push_str("</param></params></methodResponse>\n");
    Ok(out)
}

/// Serializes a `<fault>` response.
pub fn encode_fault(code: i32, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>{}</int></value></member>\
         <member><name>faultString</name><value><string>{}</string></value></member>\
         </struct></value></fault></methodResponse>\n",
        code,
        escape(message)
    )
}

/// Appends one `<value>` element for `value` to `out`.
pub fn encode_value(value: &Value, out: &mut String) -> Result<()> {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        Value::Number(n) => encode_number(n, out)?,
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out)?;
            }
            out.push_str("</data></array>");
        }
        Value::Object(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(member, out)?;
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
    Ok(())
}

fn encode_number(n: &Number, out: &mut String) -> Result<()> {
    if let Some(i) = n.as_i64() {
        let i = i32::try_from(i).map_err(|_| {
            ResdiscError::InvalidRequest(format!("integer {} does not fit in an XML-RPC int", i))
        })?;
        out.push_str(&format!("<int>{}</int>", i));
    } else if n.is_u64() {
        return Err(ResdiscError::InvalidRequest(format!(
            "integer {} does not fit in an XML-RPC int",
            n
        )));
    } else if let Some(f) = n.as_f64() {
        out.push_str(&format!("<double>{}</double>", f));
    }
    Ok(())
}
