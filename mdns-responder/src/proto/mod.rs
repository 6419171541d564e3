//! Query-processing state machine.
//!
//! A [`QueryProcessor`] is created per incoming datagram, run to completion
//! and discarded. Each call to [`QueryProcessor::run`] produces the next
//! reply datagram, or 0 once the query is fully answered:
//!
//! 1. Decode pending questions and collect matching database records as
//!    answers (with NSEC standing in when the queried type is absent).
//! 2. Add related records the querier will predictably ask for next
//!    (additional section).
//! 3. Invalidate answers the querier already holds (known-answer
//!    suppression); their related records still go out.
//! 4. Fragment the collected list into size-bounded datagrams via the
//!    embedded [`Emitter`].
//!
//! Malformed input never surfaces as an error: decoding stops, whatever was
//! committed is still emitted, and the rest of the datagram is ignored.


pub mod emitter;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::config::MAX_RESPONSE_RECORDS;
use crate::db::{Database, Domain, Record, RecordData};
use crate::message::name::{Name, name_span};
use crate::message::reader::MessageReader;
use crate::message::{Category, DnsType, HEADER_BIT_QR};

pub use emitter::Emitter;

/// The mDNS multicast group address (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// mDNS multicast destination address (224.0.0.251:5353).
///
/// All replies and announcements go to this address.
pub const MDNS_DEST_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// Maximum size of an mDNS message, IP and UDP headers included.
pub const MDNS_MSG_SIZE_MAX: usize = 9000;

/// A database record scheduled for emission, tagged with the section it goes
/// into. Valid for as long as the database it borrows from.
#[derive(Copy, Clone, Debug)]
pub struct ResponseRecord<'a> {
    pub category: Category,
    pub domain: &'a Domain,
    pub record: &'a Record,
}

fn find_record(record_list: &[ResponseRecord<'_>], record: &Record) -> bool {
    record_list
        .iter()
        .any(|rr| std::ptr::eq::<Record>(rr.record, record))
}

/// Collects every PTR record of the database as a mandatory answer, the
/// record list driven by a stand-alone [`Emitter`] for unsolicited
/// announcements.
pub fn announcement_records(database: &Database) -> Vec<ResponseRecord<'_>> {
    let mut records = Vec::new();
    for domain in database.domains() {
        for record in &domain.records {
            if matches!(record.data, RecordData::Ptr(_)) {
                records.push(ResponseRecord {
                    category: Category::Answer,
                    domain,
                    record,
                });
            }
        }
    }
    records
}

/// Per-datagram query processing state.
pub struct QueryProcessor<'a> {
    database: &'a Database,

    reader: MessageReader<'a>,
    decoding_error: bool,
    question_count: usize,
    question_index: usize,

    // mandatory answers first, optional additional records last
    record_list: Vec<ResponseRecord<'a>>,
    answer_record_count: usize,
    additional_record_count: usize,

    emitter: Emitter,
}

impl<'a> QueryProcessor<'a> {
    /// Wraps a received datagram and the database to answer from.
    ///
    /// Responses (QR flag set) are ignored wholesale by treating their
    /// question count as zero.
    pub fn new(msg: &'a [u8], database: &'a Database) -> QueryProcessor<'a> {
        let reader = MessageReader::new(msg);
        let decoding_error = !reader.is_valid();

        let question_count = if reader.flags() & HEADER_BIT_QR != 0 {
            0
        } else {
            reader.question_count()
        };

        QueryProcessor {
            database,
            reader,
            decoding_error,
            question_count,
            question_index: 0,
            record_list: Vec::with_capacity(MAX_RESPONSE_RECORDS),
            answer_record_count: 0,
            additional_record_count: 0,
            emitter: Emitter::default(),
        }
    }

    /// Produces the next reply datagram into `out` and returns its size, or 0
    /// once the whole query has been answered.
    ///
    /// Datagrams are filled up to `ideal_size` and stretched to `max_size`
    /// only for a record that alone does not fit; see [`Emitter::run`].
    pub fn run(&mut self, out: &mut [u8], ideal_size: usize, max_size: usize) -> usize {
        loop {
            let pending_questions =
                !self.decoding_error && self.question_index < self.question_count;
            let pending_records = self.emitter.has_pending();

            if pending_records {
                let out_size = self.emitter.run(&self.record_list, out, ideal_size, max_size);
                if out_size != 0 {
                    return out_size;
                }
            } else if pending_questions {
                self.decode_questions();
                self.generate_additional_records();
                self.remove_known_answers();
                self.emitter = Emitter::new(
                    self.answer_record_count,
                    self.additional_record_count,
                    false,
                );
            } else {
                return 0;
            }
        }
    }

    /// Decodes pending questions and fills the record list with answers.
    ///
    /// All answers of one question commit atomically: when they do not all
    /// fit, the partial commit is rolled back and the question is retried on
    /// a later iteration, except that a question whose answers alone overflow
    /// the list is silently skipped to guarantee progress.
    fn decode_questions(&mut self) {
        debug_assert!(!self.decoding_error);

        self.record_list.clear();
        self.answer_record_count = 0;
        self.additional_record_count = 0;

        loop {
            if self.question_index >= self.question_count {
                break;
            }
            if self.record_list.len() >= MAX_RESPONSE_RECORDS {
                break;
            }

            let entry = match self.reader.entry(self.question_index) {
                Ok(entry) => entry,
                Err(_) => {
                    self.decoding_error = true;
                    break;
                }
            };

            let typ = entry.question_type();
            let class = entry.question_class();
            if class != 1 && class != 255 {
                self.question_index += 1;
                continue;
            }

            let mut name = Name::new();
            if name
                .append_compressed_name(entry.data(), entry.name_pos())
                .is_err()
            {
                self.decoding_error = true;
                break;
            }

            let mut overflow = false;
            let first_record = self.record_list.len();
            'domains: for domain in self.database.domains() {
                if domain.name != name {
                    continue;
                }
                let mut found = false;
                let mut nsec_record: Option<&'a Record> = None;
                for record in &domain.records {
                    if record.rr_type() as u16 == typ {
                        found = true;
                        if self.record_list.len() >= MAX_RESPONSE_RECORDS {
                            overflow = true;
                            break;
                        }
                        self.record_list.push(ResponseRecord {
                            category: Category::Answer,
                            domain,
                            record,
                        });
                    } else if record.rr_type() == DnsType::Nsec {
                        nsec_record = Some(record);
                    }
                }
                // no record of the requested type: answer with the domain's
                // NSEC instead, once
                if !found
                    && !overflow
                    && let Some(nsec) = nsec_record
                    && !find_record(&self.record_list, nsec)
                {
                    if self.record_list.len() >= MAX_RESPONSE_RECORDS {
                        overflow = true;
                        break 'domains;
                    }
                    self.record_list.push(ResponseRecord {
                        category: Category::Answer,
                        domain,
                        record: nsec,
                    });
                }
            }

            if overflow {
                // we cannot store all records corresponding to this question
                if first_record == 0 {
                    // This question alone overflows the record list. Consider
                    // it answered, otherwise it would be decoded again and
                    // again with the same result, looping forever.
                    log::debug!("skipping question with more than {MAX_RESPONSE_RECORDS} answers");
                    self.record_list.clear();
                } else {
                    // Not enough space left for this question. Leave it
                    // pending: it will be decoded again once the committed
                    // answers have been emitted.
                    self.record_list.truncate(first_record);
                    break;
                }
            }

            self.question_index += 1;
        }

        self.answer_record_count = self.record_list.len();
    }

    /// Invalidates answers the querier listed in its answer section with a
    /// TTL of at least half the record's own. Only PTR records are matched.
    ///
    /// Invalidated answers stay in the list as placeholders the emitter
    /// skips, so the additional records generated for them still reach the
    /// querier.
    ///
    /// Decoding errors here are silently ignored: suppression stops but the
    /// committed answers stay valid.
    fn remove_known_answers(&mut self) {
        if self.decoding_error {
            return;
        }

        let qcount = self.reader.question_count();
        let acount = self.reader.answer_rr_count();

        'answers: for a in 0..acount {
            let Ok(entry) = self.reader.entry(qcount + a) else {
                break;
            };

            let class = entry.rr_class();
            if class != 1 && class != 255 {
                continue;
            }

            let typ = entry.rr_type();
            // TODO: manage other types
            if typ != DnsType::Ptr as u16 {
                continue;
            }
            let window = &entry.data()[..entry.rdata_pos() + entry.rdata_len()];
            match name_span(window, entry.rdata_pos()) {
                Ok(span) if span == entry.rdata_len() => {}
                _ => continue,
            }

            let ttl = entry.rr_ttl();

            let mut name = Name::new();
            if name
                .append_compressed_name(entry.data(), entry.name_pos())
                .is_err()
            {
                break;
            }

            // the PTR target is decoded lazily, at most once per entry
            let mut ptr_name = Name::new();
            let mut ptr_name_defined = false;

            for rr in self.record_list.iter_mut() {
                if rr.category != Category::Answer {
                    continue;
                }
                if rr.record.rr_type() as u16 != typ {
                    continue;
                }
                if rr.domain.name != name {
                    continue;
                }
                let RecordData::Ptr(target) = &rr.record.data else {
                    continue;
                };
                if !ptr_name_defined {
                    if ptr_name
                        .append_compressed_name(entry.data(), entry.rdata_pos())
                        .is_err()
                    {
                        break 'answers;
                    }
                    ptr_name_defined = true;
                }
                if &ptr_name != target {
                    continue;
                }
                if ttl < rr.record.ttl / 2 {
                    continue;
                }
                rr.category = Category::None; // invalidate answer
                break;
            }
        }
    }

    /// Fills the remaining list slots with records the querier will
    /// predictably need next: for every committed record whose payload points
    /// at a name (PTR target, SRV host), every record of the matching
    /// domains, deduplicated against the whole list.
    fn generate_additional_records(&mut self) {
        if self.decoding_error {
            return;
        }

        let answer_record_count = self.record_list.len();

        let mut a = 0;
        while a < self.record_list.len() {
            if self.record_list.len() >= MAX_RESPONSE_RECORDS {
                break;
            }

            let rr = self.record_list[a];
            a += 1;

            if rr.category != Category::Answer && rr.category != Category::Additional {
                continue;
            }

            let target = match &rr.record.data {
                RecordData::Ptr(target) => target,
                RecordData::Srv { target, .. } => target,
                _ => continue,
            };

            'domains: for domain in self.database.domains() {
                if self.record_list.len() >= MAX_RESPONSE_RECORDS {
                    break;
                }
                if domain.name != *target {
                    continue;
                }
                for record in &domain.records {
                    if self.record_list.len() >= MAX_RESPONSE_RECORDS {
                        break 'domains;
                    }
                    if !find_record(&self.record_list, record) {
                        self.record_list.push(ResponseRecord {
                            category: Category::Additional,
                            domain,
                            record,
                        });
                    }
                }
            }
        }

        self.additional_record_count = self.record_list.len() - answer_record_count;
    }
}
