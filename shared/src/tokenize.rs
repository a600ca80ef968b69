//! Line tokenizing used for header fields embedded in packets
//!
//! A newline separated list becomes a comma separated list. Entries that are
//! empty or contain a space, comma or quote are wrapped in quotes, with inner
//! quotes doubled. `detokenize` reverses the transform.

const SEPARATOR: u8 = b',';
const QUOTE: u8 = b'"';

fn needs_quotes(line: &[u8]) -> bool {
    line.is_empty() || line.iter().any(|&b| b == b' ' || b == SEPARATOR || b == QUOTE)
}

pub fn tokenize(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + 8);
    if input.is_empty() {
        return out;
    }

    let body = input.strip_suffix(b"\n").unwrap_or(input);
    for (index, line) in body.split(|&b| b == b'\n').enumerate() {
        if index > 0 {
            out.push(SEPARATOR);
        }

        let line: Vec<u8> = line.iter().copied().filter(|&b| b != b'\r').collect();
        if needs_quotes(&line) {
            out.push(QUOTE);
            for &b in &line {
                if b == QUOTE {
                    out.push(QUOTE);
                }
                out.push(b);
            }
            out.push(QUOTE);
        } else {
            out.extend_from_slice(&line);
        }
    }
    out
}

pub fn detokenize(input: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = Vec::new();
    if input.is_empty() {
        return Vec::new();
    }

    let mut pos = 0;
    loop {
        let mut token = Vec::new();
        if input.get(pos) == Some(&QUOTE) {
            pos += 1;
            while pos < input.len() {
                match input[pos] {
                    QUOTE if input.get(pos + 1) == Some(&QUOTE) => {
                        token.push(QUOTE);
                        pos += 2;
                    }
                    QUOTE => {
                        pos += 1;
                        break;
                    }
                    b => {
                        token.push(b);
                        pos += 1;
                    }
                }
            }
            // Anything between the closing quote and the separator is kept verbatim.
            while pos < input.len() && input[pos] != SEPARATOR {
                token.push(input[pos]);
                pos += 1;
            }
        } else {
            while pos < input.len() && input[pos] != SEPARATOR {
                token.push(input[pos]);
                pos += 1;
            }
        }
        lines.push(token);

        if pos >= input.len() {
            break;
        }
        // Skip the separator
        pos += 1;
    }

    lines.join(&b'\n')
}
