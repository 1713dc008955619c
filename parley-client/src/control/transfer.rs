use crate::config::TransferConfig;
use crate::control::ControlMux;
use crate::error::{ControlError, TransferError};
use bytes::{Bytes, BytesMut};
use parley_core::{
    ControlMessage, FileAck, FileChunk, FileId, FileOffer, FileReject, TransferStatus,
};
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A file that arrived completely.
#[derive(Debug, Clone, PartialEq)]
pub struct FileArtifact {
    pub file_id: FileId,
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// The remote peer wants to send a file; accept or reject it.
    Offered(FileOffer),
    Progress {
        file_id: FileId,
        direction: Direction,
        chunks_done: u32,
        total_chunks: u32,
    },
    Sent(FileId),
    Received(FileArtifact),
    /// An offer was declined, by either side.
    Rejected {
        file_id: FileId,
        direction: Direction,
        reason: String,
    },
    /// A started transfer was cut off.
    Aborted {
        file_id: FileId,
        direction: Direction,
        reason: String,
    },
}

struct Outgoing {
    offer: FileOffer,
    data: Bytes,
    next_index: u32,
    status: TransferStatus,
    last_activity: Instant,
}

struct Incoming {
    offer: FileOffer,
    buffer: BytesMut,
    next_index: u32,
    status: TransferStatus,
    last_activity: Instant,
}

/// Chunked file transfers over the control channel, in both directions.
///
/// Outgoing chunks are only written while the channel's buffered amount stays
/// under the high-water mark; the pump resumes on `BufferedAmountLow`.
/// Incoming chunks must arrive in order; a gap aborts the transfer.
pub struct TransferManager {
    config: TransferConfig,
    outgoing: HashMap<FileId, Outgoing>,
    incoming: HashMap<FileId, Incoming>,
}

impl TransferManager {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn status(&self, file_id: &FileId) -> Option<TransferStatus> {
        self.outgoing
            .get(file_id)
            .map(|t| t.status)
            .or_else(|| self.incoming.get(file_id).map(|t| t.status))
    }

    pub fn is_idle(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }

    pub async fn on_channel_open(&self, mux: &ControlMux) {
        if let Some(channel) = mux.channel() {
            channel.set_low_water_mark(self.config.low_water_mark).await;
        }
    }

    /// Announces a file to the remote peer. Chunks flow once it accepts.
    pub async fn offer(
        &mut self,
        mux: &ControlMux,
        name: impl Into<String>,
        mime_type: Option<String>,
        data: Bytes,
    ) -> Result<FileId, TransferError> {
        if data.is_empty() {
            return Err(TransferError::Empty);
        }

        let offer = FileOffer {
            file_id: FileId::new(),
            name: name.into(),
            size: data.len() as u64,
            chunk_size: self.config.chunk_size,
            mime_type,
        };
        mux.send(&ControlMessage::FileOffer(offer.clone())).await?;

        info!(file = %offer.file_id, name = %offer.name, size = offer.size, "Offered file");
        let file_id = offer.file_id.clone();
        self.outgoing.insert(
            file_id.clone(),
            Outgoing {
                offer,
                data,
                next_index: 0,
                status: TransferStatus::Offered,
                last_activity: Instant::now(),
            },
        );
        Ok(file_id)
    }

    pub async fn accept(&mut self, mux: &ControlMux, file_id: &FileId) -> Result<(), TransferError> {
        let transfer = self
            .incoming
            .get_mut(file_id)
            .ok_or_else(|| TransferError::UnknownFile(file_id.clone()))?;
        if transfer.status != TransferStatus::Offered {
            return Err(TransferError::InvalidState(file_id.clone()));
        }

        mux.send(&ControlMessage::FileAck(FileAck {
            file_id: file_id.clone(),
            accepted: true,
            complete: false,
        }))
        .await?;

        transfer.status = TransferStatus::Accepted;
        transfer.last_activity = Instant::now();
        Ok(())
    }

    pub async fn reject(
        &mut self,
        mux: &ControlMux,
        file_id: &FileId,
        reason: &str,
    ) -> Result<(), TransferError> {
        match self.incoming.get(file_id).map(|t| t.status) {
            None => return Err(TransferError::UnknownFile(file_id.clone())),
            Some(TransferStatus::Offered) => {}
            Some(_) => return Err(TransferError::InvalidState(file_id.clone())),
        }
        self.incoming.remove(file_id);
        send_reject(mux, file_id, reason).await?;
        Ok(())
    }

    /// Stops a transfer in either direction and tells the remote peer.
    pub async fn cancel(
        &mut self,
        mux: &ControlMux,
        file_id: &FileId,
    ) -> Result<TransferEvent, TransferError> {
        let direction = if self.outgoing.remove(file_id).is_some() {
            Direction::Outgoing
        } else if self.incoming.remove(file_id).is_some() {
            Direction::Incoming
        } else {
            return Err(TransferError::UnknownFile(file_id.clone()));
        };

        notify_abort(mux, file_id, "cancelled").await;
        Ok(TransferEvent::Aborted {
            file_id: file_id.clone(),
            direction,
            reason: "cancelled".to_owned(),
        })
    }

    /// Handles a file-* frame from the remote peer.
    pub async fn on_message(
        &mut self,
        mux: &ControlMux,
        msg: ControlMessage,
    ) -> Result<Vec<TransferEvent>, TransferError> {
        match msg {
            ControlMessage::FileOffer(offer) => self.on_offer(mux, offer).await,
            ControlMessage::FileChunk(chunk) => Ok(self.on_chunk(mux, chunk).await),
            ControlMessage::FileAck(ack) => self.on_ack(mux, ack).await,
            ControlMessage::FileReject(reject) => Ok(self.on_reject(reject)),
            other => {
                debug!(tag = other.tag(), "Not a transfer frame");
                Ok(Vec::new())
            }
        }
    }

    async fn on_offer(
        &mut self,
        mux: &ControlMux,
        offer: FileOffer,
    ) -> Result<Vec<TransferEvent>, TransferError> {
        let limit = self.config.max_incoming_file_bytes;
        let refusal = if offer.size == 0 {
            Some("empty file".to_owned())
        } else if offer.size > limit {
            Some(TransferError::TooLarge {
                size: offer.size,
                limit,
            }
            .to_string())
        } else if self.incoming.contains_key(&offer.file_id) {
            Some("duplicate file id".to_owned())
        } else {
            None
        };

        if let Some(reason) = refusal {
            warn!(file = %offer.file_id, size = offer.size, "Refusing file offer: {}", reason);
            send_reject(mux, &offer.file_id, &reason).await?;
            return Ok(vec![TransferEvent::Rejected {
                file_id: offer.file_id,
                direction: Direction::Incoming,
                reason,
            }]);
        }

        info!(file = %offer.file_id, name = %offer.name, size = offer.size, "Incoming file offer");
        self.incoming.insert(
            offer.file_id.clone(),
            Incoming {
                offer: offer.clone(),
                buffer: BytesMut::new(),
                next_index: 0,
                status: TransferStatus::Offered,
                last_activity: Instant::now(),
            },
        );
        Ok(vec![TransferEvent::Offered(offer)])
    }

    async fn on_chunk(&mut self, mux: &ControlMux, chunk: FileChunk) -> Vec<TransferEvent> {
        let Some(transfer) = self.incoming.get_mut(&chunk.file_id) else {
            debug!(file = %chunk.file_id, index = chunk.index, "Chunk for unknown transfer");
            return Vec::new();
        };

        let problem = if transfer.status == TransferStatus::Offered {
            Some("chunk before acceptance".to_owned())
        } else if chunk.index != transfer.next_index {
            Some(
                TransferError::Gap {
                    expected: transfer.next_index,
                    got: chunk.index,
                }
                .to_string(),
            )
        } else {
            let total = transfer.offer.total_chunks();
            let remaining = transfer
                .offer
                .size
                .saturating_sub(transfer.buffer.len() as u64);
            let expected_len = remaining.min(u64::from(transfer.offer.chunk_size));
            if chunk.index >= total || chunk.bytes.len() as u64 != expected_len {
                Some(format!(
                    "chunk {} has {} bytes, expected {}",
                    chunk.index,
                    chunk.bytes.len(),
                    expected_len
                ))
            } else {
                None
            }
        };

        if let Some(reason) = problem {
            warn!(file = %chunk.file_id, "Aborting incoming transfer: {}", reason);
            self.incoming.remove(&chunk.file_id);
            notify_abort(mux, &chunk.file_id, &reason).await;
            return vec![TransferEvent::Aborted {
                file_id: chunk.file_id,
                direction: Direction::Incoming,
                reason,
            }];
        }

        transfer.buffer.extend_from_slice(&chunk.bytes);
        transfer.next_index += 1;
        transfer.status = TransferStatus::InProgress;
        transfer.last_activity = Instant::now();

        let total_chunks = transfer.offer.total_chunks();
        let mut events = vec![TransferEvent::Progress {
            file_id: chunk.file_id.clone(),
            direction: Direction::Incoming,
            chunks_done: transfer.next_index,
            total_chunks,
        }];

        if transfer.next_index < total_chunks {
            return events;
        }

        let Some(done) = self.incoming.remove(&chunk.file_id) else {
            return events;
        };
        let ack = ControlMessage::FileAck(FileAck {
            file_id: chunk.file_id.clone(),
            accepted: true,
            complete: true,
        });
        if let Err(e) = mux.send(&ack).await {
            warn!(file = %chunk.file_id, "Completion ack not sent: {}", e);
        }

        info!(file = %chunk.file_id, bytes = done.buffer.len(), "File received");
        events.push(TransferEvent::Received(FileArtifact {
            file_id: done.offer.file_id,
            name: done.offer.name,
            mime_type: done.offer.mime_type,
            bytes: done.buffer.freeze(),
        }));
        events
    }

    async fn on_ack(
        &mut self,
        mux: &ControlMux,
        ack: FileAck,
    ) -> Result<Vec<TransferEvent>, TransferError> {
        let Some(transfer) = self.outgoing.get_mut(&ack.file_id) else {
            debug!(file = %ack.file_id, "Ack for unknown transfer");
            return Ok(Vec::new());
        };

        if ack.complete {
            self.outgoing.remove(&ack.file_id);
            info!(file = %ack.file_id, "File delivered");
            return Ok(vec![TransferEvent::Sent(ack.file_id)]);
        }

        if !ack.accepted {
            self.outgoing.remove(&ack.file_id);
            return Ok(vec![TransferEvent::Rejected {
                file_id: ack.file_id,
                direction: Direction::Outgoing,
                reason: "declined".to_owned(),
            }]);
        }

        if transfer.status != TransferStatus::Offered {
            return Ok(Vec::new());
        }
        transfer.status = TransferStatus::Accepted;
        transfer.last_activity = Instant::now();
        debug!(file = %ack.file_id, "Offer accepted, sending chunks");
        self.pump(mux).await
    }

    fn on_reject(&mut self, reject: FileReject) -> Vec<TransferEvent> {
        if let Some(transfer) = self.outgoing.remove(&reject.file_id) {
            let event = if transfer.status == TransferStatus::Offered {
                TransferEvent::Rejected {
                    file_id: reject.file_id,
                    direction: Direction::Outgoing,
                    reason: reject.reason,
                }
            } else {
                TransferEvent::Aborted {
                    file_id: reject.file_id,
                    direction: Direction::Outgoing,
                    reason: reject.reason,
                }
            };
            return vec![event];
        }

        if self.incoming.remove(&reject.file_id).is_some() {
            info!(file = %reject.file_id, "Sender aborted: {}", reject.reason);
            return vec![TransferEvent::Aborted {
                file_id: reject.file_id,
                direction: Direction::Incoming,
                reason: reject.reason,
            }];
        }
        Vec::new()
    }

    /// Writes chunks of accepted transfers until the high-water mark would
    /// be crossed. Call again on `BufferedAmountLow`.
    pub async fn pump(&mut self, mux: &ControlMux) -> Result<Vec<TransferEvent>, TransferError> {
        let Some(channel) = mux.channel() else {
            return Ok(Vec::new());
        };
        let high_water = self.config.high_water_mark;
        let mut events = Vec::new();

        for transfer in self.outgoing.values_mut() {
            if !matches!(
                transfer.status,
                TransferStatus::Accepted | TransferStatus::InProgress
            ) {
                continue;
            }

            let total = transfer.offer.total_chunks();
            let chunk_size = transfer.offer.chunk_size as usize;

            while transfer.next_index < total {
                let start = transfer.next_index as usize * chunk_size;
                let end = (start + chunk_size).min(transfer.data.len());
                let frame = ControlMessage::FileChunk(FileChunk {
                    file_id: transfer.offer.file_id.clone(),
                    index: transfer.next_index,
                    bytes: transfer.data[start..end].to_vec(),
                })
                .encode()
                .map_err(ControlError::from)?;

                // An empty buffer always takes one frame, so a frame larger
                // than the high water mark cannot stall the transfer.
                let buffered = channel.buffered_amount().await;
                if buffered > 0 && buffered + frame.len() > high_water {
                    debug!(
                        file = %transfer.offer.file_id,
                        buffered,
                        "Send buffer full, waiting for it to drain"
                    );
                    return Ok(events);
                }

                channel.send_text(frame).await.map_err(ControlError::from)?;
                transfer.next_index += 1;
                transfer.status = TransferStatus::InProgress;
                transfer.last_activity = Instant::now();
                events.push(TransferEvent::Progress {
                    file_id: transfer.offer.file_id.clone(),
                    direction: Direction::Outgoing,
                    chunks_done: transfer.next_index,
                    total_chunks: total,
                });
            }
        }
        Ok(events)
    }

    /// Aborts offers nobody answered and transfers that went quiet.
    pub async fn check_timeouts(&mut self, mux: &ControlMux, now: Instant) -> Vec<TransferEvent> {
        let accept_timeout = self.config.accept_timeout();
        let idle_timeout = self.config.idle_timeout();
        let expired = |status: TransferStatus, last: Instant| {
            let limit = if status == TransferStatus::Offered {
                accept_timeout
            } else {
                idle_timeout
            };
            now.saturating_duration_since(last) >= limit
        };

        let mut timed_out: Vec<(FileId, Direction)> = self
            .outgoing
            .iter()
            .filter(|(_, t)| expired(t.status, t.last_activity))
            .map(|(id, _)| (id.clone(), Direction::Outgoing))
            .collect();
        timed_out.extend(
            self.incoming
                .iter()
                .filter(|(_, t)| expired(t.status, t.last_activity))
                .map(|(id, _)| (id.clone(), Direction::Incoming)),
        );

        let mut events = Vec::with_capacity(timed_out.len());
        for (file_id, direction) in timed_out {
            match direction {
                Direction::Outgoing => {
                    self.outgoing.remove(&file_id);
                }
                Direction::Incoming => {
                    self.incoming.remove(&file_id);
                }
            }
            let reason = TransferError::TimedOut(file_id.clone()).to_string();
            warn!(file = %file_id, ?direction, "Transfer timed out");
            notify_abort(mux, &file_id, &reason).await;
            events.push(TransferEvent::Aborted {
                file_id,
                direction,
                reason,
            });
        }
        events
    }

    /// Drops every transfer, e.g. when the channel closed underneath them.
    pub fn abort_all(&mut self, reason: &str) -> Vec<TransferEvent> {
        let outgoing = self
            .outgoing
            .drain()
            .map(|(file_id, _)| (file_id, Direction::Outgoing));
        let incoming = self
            .incoming
            .drain()
            .map(|(file_id, _)| (file_id, Direction::Incoming));

        outgoing
            .chain(incoming)
            .map(|(file_id, direction)| TransferEvent::Aborted {
                file_id,
                direction,
                reason: reason.to_owned(),
            })
            .collect()
    }
}

async fn send_reject(mux: &ControlMux, file_id: &FileId, reason: &str) -> Result<(), ControlError> {
    mux.send(&ControlMessage::FileReject(FileReject {
        file_id: file_id.clone(),
        reason: reason.to_owned(),
    }))
    .await
}

async fn notify_abort(mux: &ControlMux, file_id: &FileId, reason: &str) {
    if let Err(e) = send_reject(mux, file_id, reason).await {
        debug!(file = %file_id, "Abort notice not sent: {}", e);
    }
}
