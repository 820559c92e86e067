// dnslink – resolution of DNSLink records
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Common utilities.

/// A trait for entities that can be represented as a canonical string.
pub trait CanonicalStr {
    /// Returns the canonical representation as a static string slice.
    fn canonical_str(&self) -> &'static str;
}

/// Decodes percent-encoded octets (`%2F`, `%c3%a4`) in a string.
///
/// Returns `None` if an escape sequence is ill-formed or if the decoded octets
/// are not valid UTF-8.
pub fn percent_decode(s: &str) -> Option<String> {
    if !s.contains('%') {
        return Some(s.into());
    }

    let mut result = Vec::with_capacity(s.len());

    let mut bytes = s.bytes();

    while let Some(b) = bytes.next() {
        if b == b'%' {
            let h1 = bytes.next().filter(u8::is_ascii_hexdigit)?;
            let h2 = bytes.next().filter(u8::is_ascii_hexdigit)?;
            result.push((hex_value(h1) << 4) | hex_value(h2));
        } else {
            result.push(b);
        }
    }

    String::from_utf8(result).ok()
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

// space through tilde
pub fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}
