use std::fmt::Write;

/// Renders a canonical hex display of `data` (offset, sixteen hex bytes, ASCII column).
///
/// `offset` is added to the printed addresses, so a slice can be dumped with the address it has
/// inside its parent buffer. At most `limit` bytes are rendered.
pub fn hexdump(data: &[u8], offset: usize, limit: usize) -> String {
    let data = &data[..data.len().min(limit)];
    let mut out = String::with_capacity(data.len() * 4 + 16);

    for (line_no, line) in data.chunks(16).enumerate() {
        // print address (ex - 000000d0)
        let _ = write!(out, "\n{:08x}:", offset + line_no * 16);

        for b in line {
            let _ = write!(out, " {:02x}", b);
        }

        // align
        for _ in line.len()..16 {
            out.push_str("   ");
        }

        out.push_str("  |");
        for c in line {
            // replace all control chars with dots
            match (*c as char).is_ascii_graphic() || *c == b' ' {
                true => out.push(*c as char),
                false => out.push('.'),
            }
        }
        out.push('|');
    }

    out
}
