//! Diagnostic dumping of messages and databases.
//!
//! The adapters here render wire messages and databases as indented
//! multi-line text for logging:
//!
//! ```rust,ignore
//! log::debug!("received\n{}", MessageDump(&datagram));
//! ```

use std::fmt;

use crate::db::{Database, RecordData};
use crate::message::name::name_span;
use crate::message::packer::get_uint16;
use crate::message::reader::{Entry, MessageReader};
use crate::message::{DnsClass, DnsType};

fn fmt_label_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for &c in bytes {
        match c {
            b'.' => write!(f, "\\.")?,
            b'\\' => write!(f, "\\\\")?,
            b'\t' => write!(f, "\\t")?,
            b'\n' => write!(f, "\\n")?,
            b'\r' => write!(f, "\\r")?,
            c if c < 32 || c >= 127 => write!(f, "\\x{c:02X}")?,
            c => write!(f, "{}", c as char)?,
        }
    }
    Ok(())
}

// Renders a possibly-compressed name; the caller must have validated it.
fn fmt_name(f: &mut fmt::Formatter<'_>, data: &[u8], pos: usize) -> fmt::Result {
    let mut i = pos;
    loop {
        if i >= data.len() {
            return write!(f, "?");
        }
        let count = data[i] as usize;
        if count == 0 {
            return Ok(());
        }
        if i != pos {
            write!(f, ".")?;
        }
        if count < 0xc0 {
            i += 1;
            if i + count > data.len() {
                return write!(f, "?");
            }
            fmt_label_bytes(f, &data[i..i + count])?;
            i += count;
        } else {
            if i + 2 > data.len() {
                return write!(f, "?");
            }
            let ptr = (count & 0x3f) << 8 | data[i + 1] as usize;
            if ptr >= pos {
                return write!(f, "?");
            }
            return fmt_name(f, data, ptr);
        }
    }
}

fn fmt_question(f: &mut fmt::Formatter<'_>, entry: &Entry<'_>) -> fmt::Result {
    write!(f, "    name:  ")?;
    fmt_name(f, entry.data(), entry.name_pos())?;
    writeln!(f)?;
    let typ = entry.question_type();
    writeln!(f, "    type:  {} ({})", typ, DnsType::from(typ))?;
    writeln!(f, "    class: {}", DnsClass(entry.question_class()))?;
    writeln!(
        f,
        "    unicast_response: {}",
        entry.question_unicast_response() as u8
    )
}

fn fmt_rr(f: &mut fmt::Formatter<'_>, entry: &Entry<'_>) -> fmt::Result {
    write!(f, "    name:  ")?;
    fmt_name(f, entry.data(), entry.name_pos())?;
    writeln!(f)?;
    let typ = entry.rr_type();
    writeln!(f, "    type:  {} ({})", typ, DnsType::from(typ))?;
    writeln!(f, "    class: {}", DnsClass(entry.rr_class()))?;
    writeln!(f, "    cache_flush: {}", entry.rr_cache_flush() as u8)?;
    writeln!(f, "    ttl:   {}", entry.rr_ttl())?;

    let data = entry.data();
    let rpos = entry.rdata_pos();
    let rsize = entry.rdata_len();
    let rdata = &data[rpos..rpos + rsize];

    match DnsType::from(typ) {
        DnsType::Ptr => {
            write!(f, "    rdata: ")?;
            match name_span(&data[..rpos + rsize], rpos) {
                Ok(span) if span == rsize => fmt_name(f, data, rpos)?,
                _ => write!(f, "<format error>")?,
            }
            writeln!(f)
        }
        DnsType::A => {
            if rsize == 4 {
                writeln!(
                    f,
                    "    addr:  {}.{}.{}.{}",
                    rdata[0], rdata[1], rdata[2], rdata[3]
                )
            } else {
                writeln!(f, "    addr:  error")
            }
        }
        DnsType::Aaaa => {
            if rsize == 16 {
                write!(f, "    addr:  ")?;
                for (i, b) in rdata.iter().enumerate() {
                    if i > 0 && i % 2 == 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                writeln!(f)
            } else {
                writeln!(f, "    addr:  error")
            }
        }
        DnsType::Srv => {
            if rsize < 7 {
                writeln!(f, "    srv:   <format error>")
            } else {
                writeln!(f, "    priority: {}", get_uint16(rdata, 0))?;
                writeln!(f, "    weight:   {}", get_uint16(rdata, 2))?;
                writeln!(f, "    port:     {}", get_uint16(rdata, 4))?;
                write!(f, "    target:   ")?;
                match name_span(&data[..rpos + rsize], rpos + 6) {
                    Ok(span) if span + 6 == rsize => fmt_name(f, data, rpos + 6)?,
                    _ => write!(f, "<format error>")?,
                }
                writeln!(f)
            }
        }
        DnsType::Nsec => {
            write!(f, "    name:  ")?;
            let span = match name_span(&data[..rpos + rsize], rpos) {
                Ok(span) => {
                    fmt_name(f, data, rpos)?;
                    span
                }
                Err(_) => {
                    write!(f, "<format error>")?;
                    rsize
                }
            };
            writeln!(f)?;
            write!(f, "    types: ")?;
            let mut p = span;
            let mut first = true;
            loop {
                if p >= rsize {
                    break;
                }
                if p + 2 > rsize {
                    write!(f, "<format error>")?;
                    break;
                }
                let mut typ = (rdata[p] as usize) << 8;
                p += 1;
                let count = rdata[p] as usize;
                p += 1;
                if p + count > rsize || count >= 32 {
                    write!(f, "<format error>")?;
                    break;
                }
                for _ in 0..count {
                    let mut mask = rdata[p];
                    for _ in 0..8 {
                        if mask & 0x80 != 0 {
                            if first {
                                first = false;
                            } else {
                                write!(f, ", ")?;
                            }
                            write!(f, "{} ({})", typ, DnsType::from(typ as u16))?;
                        }
                        mask <<= 1;
                        typ += 1;
                    }
                    p += 1;
                }
            }
            writeln!(f)
        }
        _ => {
            write!(f, "    rdata: ")?;
            fmt_label_bytes(f, rdata)?;
            writeln!(f)
        }
    }
}

/// Renders a whole wire message for logging.
pub struct MessageDump<'a>(pub &'a [u8]);

impl fmt::Display for MessageDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reader = MessageReader::new(self.0);
        if !reader.is_valid() {
            return writeln!(f, "  <malformed message: {} bytes>", self.0.len());
        }

        writeln!(f, "  id:    0x{:04x}", reader.id())?;
        writeln!(f, "  flags: 0x{:04x}", reader.flags())?;
        let q_count = reader.question_count();
        let an_count = reader.answer_rr_count();
        let ns_count = reader.authority_rr_count();
        let ar_count = reader.additional_rr_count();

        for i in 0..q_count + an_count + ns_count + ar_count {
            let section = if i < q_count {
                "question"
            } else if i < q_count + an_count {
                "answer"
            } else if i < q_count + an_count + ns_count {
                "authority"
            } else {
                "additional"
            };
            writeln!(f, "  {section}:")?;
            let Ok(entry) = reader.entry(i) else {
                return writeln!(f, "    <format error>");
            };
            if i < q_count {
                fmt_question(f, &entry)?;
            } else {
                fmt_rr(f, &entry)?;
            }
        }
        Ok(())
    }
}

/// Renders a record database for logging.
pub struct DatabaseDump<'a>(pub &'a Database);

impl fmt::Display for DatabaseDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for domain in self.0.domains() {
            writeln!(f, "  {}", domain.name)?;
            for record in &domain.records {
                write!(
                    f,
                    "    {} ttl={} cache_flush={}",
                    record.rr_type(),
                    record.ttl,
                    record.cache_flush as u8
                )?;
                match &record.data {
                    RecordData::A(addr) => {
                        write!(f, " addr={}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])?
                    }
                    RecordData::Aaaa(_) => write!(f, " addr=<ipv6>")?,
                    RecordData::Ptr(target) => write!(f, " target={target}")?,
                    RecordData::Srv { port, target } => {
                        write!(f, " port={port} target={target}")?
                    }
                    RecordData::Txt(blob) => write!(f, " len={}", blob.len())?,
                    RecordData::Nsec => {}
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
