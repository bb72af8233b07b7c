use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const BEGIN_MARKER: &str = "-----BEGIN CERTIFICATE-----";
pub const END_MARKER: &str = "-----END CERTIFICATE-----";

const LINE_WIDTH: usize = 64;

/// Armors DER bytes as a PEM certificate, 64 base64 columns per line and a
/// newline after every line including the end marker.
pub fn to_pem(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let lines = body.len().div_ceil(LINE_WIDTH);
    let mut pem =
        String::with_capacity(BEGIN_MARKER.len() + END_MARKER.len() + body.len() + lines + 2);

    pem.push_str(BEGIN_MARKER);
    pem.push('\n');

    // base64 output is ASCII so byte offsets are char boundaries
    let mut rest = body.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        pem.push_str(line);
        pem.push('\n');
        rest = tail;
    }

    pem.push_str(END_MARKER);
    pem.push('\n');
    pem
}

/// Decodes the first certificate block of `pem`. Whitespace inside the body
/// is ignored.
pub fn from_pem(pem: &str) -> Option<Vec<u8>> {
    let start = pem.find(BEGIN_MARKER)? + BEGIN_MARKER.len();
    let end = start + pem[start..].find(END_MARKER)?;

    let body: String = pem[start..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD.decode(body).ok()
}
