//! Response emitter.
//!
//! Fragments an ordered response-record list into one or more size-bounded
//! datagrams. The list is split into a mandatory prefix (answers, always
//! delivered) and an optional suffix (additional records, which only ride
//! along with mandatory records and never get datagrams of their own).

use crate::db::{Record, RecordData};
use crate::message::builder::MessageBuilder;
use crate::message::{Category, DnsType, HEADER_BIT_AA, HEADER_BIT_QR};

use super::ResponseRecord;

/// Header flags of every reply: response + authoritative.
pub(crate) const RESPONSE_FLAGS: u16 = HEADER_BIT_QR | HEADER_BIT_AA;

fn nsec_type_mask(rr: &ResponseRecord<'_>) -> u64 {
    // list all record types available in this domain
    let mut type_mask: u64 = 0;
    for record in &rr.domain.records {
        if std::ptr::eq::<Record>(record, rr.record) {
            continue;
        }
        let typ = record.rr_type() as u16;
        if typ >= 64 {
            panic!("unsupported record type {typ} in nsec bitmap");
        }
        type_mask |= 1 << typ;
    }
    type_mask
}

fn add_record(builder: &mut MessageBuilder<'_>, rr: &ResponseRecord<'_>, tear_down: bool) -> bool {
    let ttl = if tear_down { 0 } else { rr.record.ttl };
    let name = rr.domain.name.as_bytes();
    let cache_flush = rr.record.cache_flush;

    match &rr.record.data {
        RecordData::A(addr) => builder.add_rr_a(name, cache_flush, ttl, addr),
        RecordData::Aaaa(addr) => builder.add_rr_aaaa(name, cache_flush, ttl, addr),
        RecordData::Ptr(target) => {
            builder.add_rr_name(name, DnsType::Ptr as u16, cache_flush, ttl, target.as_bytes())
        }
        RecordData::Srv { port, target } => {
            builder.add_rr_srv(name, cache_flush, ttl, 0, 0, *port, target.as_bytes())
        }
        RecordData::Txt(blob) => {
            builder.add_rr_name(name, DnsType::Txt as u16, cache_flush, ttl, blob)
        }
        RecordData::Nsec => builder.add_rr_nsec(name, cache_flush, ttl, nsec_type_mask(rr)),
    }
}

/// Drives a response-record list into reply datagrams.
///
/// Embedded in the query processor, or stand-alone for unsolicited
/// announcements. With `tear_down` set every record goes out with TTL 0, the
/// conventional goodbye announcement.
#[derive(Default, Debug)]
pub struct Emitter {
    mandatory_record_count: usize,
    optional_record_count: usize,
    record_index: usize,
    tear_down: bool,
}

impl Emitter {
    /// Prepares emission over a list whose first `mandatory_record_count`
    /// entries must be delivered and whose following `optional_record_count`
    /// entries ride along as space permits.
    pub fn new(mandatory_record_count: usize, optional_record_count: usize, tear_down: bool) -> Self {
        Emitter {
            mandatory_record_count,
            optional_record_count,
            record_index: 0,
            tear_down,
        }
    }

    /// True while mandatory records remain to be emitted.
    pub fn has_pending(&self) -> bool {
        self.record_index < self.mandatory_record_count
    }

    /// Emits the next datagram into `out` and returns its size, or 0 once all
    /// mandatory records have gone out.
    ///
    /// Datagrams are filled up to `ideal_size`. A record that alone does not
    /// fit an ideal-size message is retried once in a message of `max_size`;
    /// if even that is not enough the record is dropped. `ideal_size` must
    /// not exceed `max_size` and both must hold at least a header.
    pub fn run(
        &mut self,
        records: &[ResponseRecord<'_>],
        out: &mut [u8],
        ideal_size: usize,
        max_size: usize,
    ) -> usize {
        if ideal_size > max_size {
            panic!("inconsistent output message size");
        }

        if self.record_index >= self.mandatory_record_count {
            return 0;
        }

        let mut builder = MessageBuilder::new(&mut out[..ideal_size], 0, RESPONSE_FLAGS);
        let mut category = Category::None;

        // emit mandatory records

        let first_record_index = self.record_index;

        loop {
            if self.record_index >= self.mandatory_record_count {
                break;
            }
            let rr = &records[self.record_index];
            if rr.category == Category::None {
                // invalidated by known-answer suppression
                self.record_index += 1;
                continue;
            }
            if category != rr.category {
                category = rr.category;
                builder.set_category(rr.category);
            }
            if !add_record(&mut builder, rr, self.tear_down) {
                // output msg is full
                if self.record_index == first_record_index {
                    // This record alone does not fit into an ideal message.
                    // Let's try to use the biggest allowed message.
                    drop(builder);
                    {
                        let mut big = MessageBuilder::new(&mut out[..max_size], 0, RESPONSE_FLAGS);
                        if add_record(&mut big, rr, self.tear_down) {
                            self.record_index += 1;
                            return big.size();
                        }
                    }
                    // record really too big - ignore it
                    log::warn!(
                        "dropping record of {} too big for a {max_size} byte message",
                        rr.domain.name
                    );
                    builder = MessageBuilder::new(&mut out[..ideal_size], 0, RESPONSE_FLAGS);
                    category = Category::None;
                } else {
                    // keep the message as it is, remaining records will be sent later
                    return builder.size();
                }
            }
            self.record_index += 1;
        }

        // emit optional records

        debug_assert!(self.record_index >= self.mandatory_record_count);

        loop {
            if self.record_index >= self.mandatory_record_count + self.optional_record_count {
                break;
            }
            let rr = &records[self.record_index];
            if category != rr.category {
                category = rr.category;
                builder.set_category(rr.category);
            }
            if !add_record(&mut builder, rr, self.tear_down) {
                break;
            }
            self.record_index += 1;
        }

        builder.size()
    }
}
