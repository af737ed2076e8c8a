use crate::error::NegotiationError;
use crate::media::MediaStream;
use crate::negotiation::{NegotiatorConfig, Role};
use crate::peer::{MediaTrack, PeerConnection, SignalingState};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tandem_core::{IceCandidate, SdpType, SessionDescription};
use tokio::sync::Mutex;
use tracing::debug;

/// Offer/answer driver for one remote counterpart, resolving glare with the
/// polite/impolite rule.
///
/// All operations take `&self`: an application-initiated [`create_offer`]
/// may be suspended inside the backend while an inbound offer is handled on
/// the same event loop, and the making-offer flag is what lets the inbound
/// side see that. Description changes are applied one at a time, so the
/// glare decision always sees the state it acts on.
///
/// [`create_offer`]: Negotiator::create_offer
pub struct Negotiator<P> {
    peer: P,
    role: Role,
    making_offer: AtomicBool,
    ignore_offer: AtomicBool,
    answered: AtomicU64,
    apply: Mutex<()>,
}

/// Clears the making-offer flag on every exit path, including errors.
struct MakingOffer<'a>(&'a AtomicBool);

impl<'a> MakingOffer<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for MakingOffer<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<P: PeerConnection> Negotiator<P> {
    pub fn new(peer: P, config: &NegotiatorConfig) -> Self {
        Self::with_role(peer, config.role())
    }

    pub fn with_role(peer: P, role: Role) -> Self {
        Self {
            peer,
            role,
            making_offer: AtomicBool::new(false),
            ignore_offer: AtomicBool::new(false),
            answered: AtomicU64::new(0),
            apply: Mutex::new(()),
        }
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.peer.signaling_state()
    }

    pub fn is_making_offer(&self) -> bool {
        self.making_offer.load(Ordering::SeqCst)
    }

    /// Generates an offer, applies it locally and returns it for relaying.
    ///
    /// Fails with [`NegotiationError::OfferSuperseded`] when a remote offer is
    /// accepted while the backend is still generating ours.
    pub async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        self.expect_state("create_offer", SignalingState::Stable)?;
        let _guard = MakingOffer::start(&self.making_offer);
        let answered = self.answered.load(Ordering::SeqCst);

        let offer = self.peer.create_offer().await?;
        let _apply = self.apply.lock().await;
        // An inbound offer may have been applied while the backend worked.
        if self.answered.load(Ordering::SeqCst) != answered {
            debug!("Dropping local offer built before a remote offer was answered");
            return Err(NegotiationError::OfferSuperseded);
        }
        self.expect_state("create_offer", SignalingState::Stable)?;
        self.peer.set_local_description(offer.clone()).await?;

        debug!("Local offer applied ({:?})", self.role);
        Ok(offer)
    }

    /// Applies a remote offer and answers it, following the glare rule.
    ///
    /// Fails with [`NegotiationError::OfferIgnored`] when this side is
    /// impolite and the offer collides with its own.
    pub async fn create_answer(
        &self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        if offer.sdp_type != SdpType::Offer {
            return Err(NegotiationError::UnexpectedDescription {
                expected: SdpType::Offer,
                actual: offer.sdp_type,
            });
        }

        // Held through rollback and both applies: a local offer landing
        // between the state read and the remote apply would strand both sides.
        let _apply = self.apply.lock().await;
        let state = self.peer.signaling_state();
        let collision = self.is_making_offer() || state != SignalingState::Stable;
        let ignore = collision && !self.role.is_polite();
        self.ignore_offer.store(ignore, Ordering::SeqCst);

        if ignore {
            debug!("Ignoring colliding offer in state {}", state);
            return Err(NegotiationError::OfferIgnored);
        }

        if collision && state == SignalingState::HaveLocalOffer {
            debug!("Rolling back local offer to accept the remote one");
            self.peer.rollback().await?;
        }

        self.peer.set_remote_description(offer).await?;
        self.answered.fetch_add(1, Ordering::SeqCst);
        let answer = self.peer.create_answer().await?;
        self.peer.set_local_description(answer.clone()).await?;

        debug!("Answered remote offer ({:?})", self.role);
        Ok(answer)
    }

    /// Applies the answer to our outstanding offer.
    pub async fn set_remote_answer(&self, answer: SessionDescription) -> Result<(), NegotiationError> {
        if !matches!(answer.sdp_type, SdpType::Answer | SdpType::Pranswer) {
            return Err(NegotiationError::UnexpectedDescription {
                expected: SdpType::Answer,
                actual: answer.sdp_type,
            });
        }
        let _apply = self.apply.lock().await;
        self.expect_state("set_remote_answer", SignalingState::HaveLocalOffer)?;

        self.peer.set_remote_description(answer).await?;
        debug!("Remote answer applied, state {}", self.peer.signaling_state());
        Ok(())
    }

    /// Routes an inbound description: offers are answered (`Some(answer)`),
    /// answers are applied. An ignored colliding offer yields `None`.
    pub async fn handle_description(
        &self,
        desc: SessionDescription,
    ) -> Result<Option<SessionDescription>, NegotiationError> {
        match desc.sdp_type {
            SdpType::Offer => match self.create_answer(desc).await {
                Ok(answer) => Ok(Some(answer)),
                Err(NegotiationError::OfferIgnored) => Ok(None),
                Err(e) => Err(e),
            },
            SdpType::Answer | SdpType::Pranswer => {
                self.set_remote_answer(desc).await?;
                Ok(None)
            }
            SdpType::Rollback => Err(NegotiationError::UnexpectedDescription {
                expected: SdpType::Offer,
                actual: SdpType::Rollback,
            }),
        }
    }

    /// Candidates that belong to an ignored offer fail to apply; those errors
    /// are swallowed.
    pub async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        match self.peer.add_ice_candidate(candidate).await {
            Ok(()) => Ok(()),
            Err(e) if self.ignore_offer.load(Ordering::SeqCst) => {
                debug!("Dropping candidate of ignored offer: {}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Puts every track of `stream` on the connection: a sender already
    /// carrying the same kind gets its track replaced, otherwise a new sender
    /// is added. Tracks of unknown kind always get their own sender. Returns
    /// how many senders changed; attaching the same stream again changes
    /// nothing.
    pub async fn attach_stream(
        &self,
        stream: &MediaStream<P::Track>,
    ) -> Result<usize, NegotiationError> {
        let mut changed = 0;
        for track in &stream.tracks {
            let kind = track.kind();
            let id = track.id();
            let senders = self.peer.senders().await;

            if senders
                .iter()
                .any(|slot| slot.track_id.as_deref() == Some(id.as_str()))
            {
                continue;
            }

            let same_kind = kind.and_then(|kind| {
                senders
                    .into_iter()
                    .find(|slot| slot.kind == Some(kind))
            });
            match same_kind {
                Some(slot) => {
                    self.peer.replace_track(&slot.sender, track).await?;
                    debug!("Replaced {:?} track with {}", kind, id);
                }
                None => {
                    self.peer.add_track(track, &stream.id).await?;
                    debug!("Added {:?} track {}", kind, id);
                }
            }
            changed += 1;
        }
        Ok(changed)
    }

    pub async fn close(&self) -> Result<(), NegotiationError> {
        self.peer.close().await?;
        Ok(())
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: SignalingState,
    ) -> Result<(), NegotiationError> {
        let state = self.peer.signaling_state();
        if state != expected {
            return Err(NegotiationError::InvalidState { operation, state });
        }
        Ok(())
    }
}
