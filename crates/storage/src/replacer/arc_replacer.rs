use std::collections::HashMap;
use std::sync::Mutex;

use super::replacer::Replacer;
use super::slab_list::{SlabList, SlotId};
use crate::typedef::{FrameId, PageId};

/// Which of the four ARC lists an entry currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    /// Resident, seen exactly once recently.
    Mru,
    /// Resident, seen more than once.
    Mfu,
    /// Evicted from `mru`; only the page id is remembered.
    MruGhost,
    /// Evicted from `mfu`; only the page id is remembered.
    MfuGhost,
}

/// Bookkeeping record for one entry, shared between the list that orders it
/// and the index that names it. The `slot` handle must always point at the
/// entry's node in the list named by `region`.
#[derive(Debug)]
struct FrameStatus {
    page_id: PageId,
    frame_id: FrameId,
    evictable: bool,
    region: Region,
    slot: SlotId,
}

#[derive(Debug)]
struct ArcInner {
    /// Maximum number of resident frames, and the cap on each ghost side.
    replacer_size: usize,
    /// Resident frames seen once recently. The front is the MRU end.
    mru: SlabList<FrameId>,
    /// Resident frames seen more than once.
    mfu: SlabList<FrameId>,
    /// Page ids of frames evicted from `mru`.
    mru_ghost: SlabList<PageId>,
    /// Page ids of frames evicted from `mfu`.
    mfu_ghost: SlabList<PageId>,
    /// Index of resident entries by frame id.
    alive: HashMap<FrameId, FrameStatus>,
    /// Index of ghost entries by page id.
    ghost: HashMap<PageId, FrameStatus>,
    /// Adaptive target size for `mru`, always within `[0, replacer_size]`.
    mru_target_size: usize,
    /// Number of evictable resident entries.
    curr_size: usize,
}

/// Implements the adaptive replacement cache policy (ARC), which balances
/// recency against frequency and tunes itself from the history of its own
/// evictions.
///
/// Resident frames live in `mru` (seen once) or `mfu` (seen repeatedly). The
/// page ids of evicted frames linger in the matching ghost list; an access
/// that hits a ghost proves the corresponding side deserved more room, and
/// shifts the target split between the two sides accordingly.
#[derive(Debug)]
pub struct ArcReplacer {
    inner: Mutex<ArcInner>,
}

impl ArcReplacer {
    /// Creates an ARC replacer able to hold `num_frames` resident frames,
    /// with all lists empty and the target size at zero.
    pub fn new(num_frames: usize) -> Self {
        Self {
            inner: Mutex::new(ArcInner {
                replacer_size: num_frames,
                mru: SlabList::new(),
                mfu: SlabList::new(),
                mru_ghost: SlabList::new(),
                mfu_ghost: SlabList::new(),
                alive: HashMap::new(),
                ghost: HashMap::new(),
                mru_target_size: 0,
                curr_size: 0,
            }),
        }
    }
}

impl Replacer for ArcReplacer {
    fn record_access(&self, frame_id: FrameId, page_id: PageId) {
        self.inner.lock().unwrap().record_access(frame_id, page_id)
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.inner.lock().unwrap().set_evictable(frame_id, evictable)
    }

    fn evict(&self) -> Option<FrameId> {
        self.inner.lock().unwrap().evict()
    }

    fn remove(&self, frame_id: FrameId) {
        self.inner.lock().unwrap().remove(frame_id)
    }

    fn evictable_count(&self) -> usize {
        self.inner.lock().unwrap().curr_size
    }
}

impl ArcInner {
    /// Brings the accessed entry to the front of `mfu` if it is known to any
    /// of the four lists, or admits it at the front of `mru` if it is not.
    /// Eviction is never performed here; this only prepares the lists so
    /// [`ArcInner::evict`] can take the victim at the back of either side.
    fn record_access(&mut self, frame_id: FrameId, page_id: PageId) {
        // Resident hit. Frame identity wins: a caller passing a page id that
        // differs from the one recorded at admission is still a hit on the
        // frame, and the recorded page id stays authoritative.
        if let Some(status) = self.alive.get_mut(&frame_id) {
            if status.region == Region::Mru {
                // Second access: promote from the once-seen side.
                self.mru.remove(status.slot);
                status.slot = self.mfu.push_front(frame_id);
                status.region = Region::Mfu;
            } else {
                self.mfu.move_to_front(status.slot);
            }
            return;
        }

        // Ghost hit. The page was evicted recently; its return proves the
        // side it was evicted from deserved more room.
        if let Some(status) = self.ghost.remove(&page_id) {
            match status.region {
                Region::MruGhost => {
                    let delta = if self.mru_ghost.len() >= self.mfu_ghost.len() {
                        1
                    } else {
                        self.mfu_ghost.len() / self.mru_ghost.len()
                    };
                    self.mru_target_size =
                        usize::min(self.mru_target_size + delta, self.replacer_size);
                    self.mru_ghost.remove(status.slot);
                }
                Region::MfuGhost => {
                    let delta = if self.mfu_ghost.len() >= self.mru_ghost.len() {
                        1
                    } else {
                        self.mru_ghost.len() / self.mfu_ghost.len()
                    };
                    self.mru_target_size = self.mru_target_size.saturating_sub(delta);
                    self.mfu_ghost.remove(status.slot);
                }
                // The ghost index never holds resident regions.
                Region::Mru | Region::Mfu => unreachable!(),
            }
            self.admit(frame_id, page_id, Region::Mfu);
            return;
        }

        // Complete miss: trim history to keep the capacity bounds, then
        // admit on the once-seen side.
        let once_seen = self.mru.len() + self.mru_ghost.len();
        let total =
            self.mru.len() + self.mfu.len() + self.mru_ghost.len() + self.mfu_ghost.len();
        if once_seen == self.replacer_size {
            if self.mru.len() < self.replacer_size {
                if let Some(stale) = self.mru_ghost.pop_back() {
                    self.ghost.remove(&stale);
                }
            } else {
                // The once-seen side is entirely resident, so there is no
                // ghost history to shed; the coldest resident entry goes
                // instead, without leaving a ghost behind.
                if let Some(cold) = self.mru.pop_back() {
                    if let Some(status) = self.alive.remove(&cold) {
                        if status.evictable {
                            self.curr_size -= 1;
                        }
                    }
                }
            }
        } else if total == 2 * self.replacer_size {
            if let Some(stale) = self.mfu_ghost.pop_back() {
                self.ghost.remove(&stale);
            }
        }
        self.admit(frame_id, page_id, Region::Mru);
    }

    /// Inserts a fresh resident entry at the MRU end of the given side.
    fn admit(&mut self, frame_id: FrameId, page_id: PageId, region: Region) {
        let slot = match region {
            Region::Mru => self.mru.push_front(frame_id),
            Region::Mfu => self.mfu.push_front(frame_id),
            Region::MruGhost | Region::MfuGhost => unreachable!(),
        };
        self.alive.insert(
            frame_id,
            FrameStatus {
                page_id,
                frame_id,
                evictable: true,
                region,
                slot,
            },
        );
        self.curr_size += 1;
    }

    /// Victimizes the least recently used evictable entry, preferring the
    /// once-seen side while it is at or above its target size and falling
    /// back to the other side when the preferred one has no candidate.
    fn evict(&mut self) -> Option<FrameId> {
        if self.mru.len() >= self.mru_target_size {
            self.evict_side(Region::Mru)
                .or_else(|| self.evict_side(Region::Mfu))
        } else {
            self.evict_side(Region::Mfu)
                .or_else(|| self.evict_side(Region::Mru))
        }
    }

    /// Scans one resident list from its LRU end for an evictable entry and
    /// moves the entry's page id into the matching ghost list. Pinned entries
    /// are skipped and keep their relative order.
    fn evict_side(&mut self, region: Region) -> Option<FrameId> {
        let list = match region {
            Region::Mru => &self.mru,
            Region::Mfu => &self.mfu,
            Region::MruGhost | Region::MfuGhost => unreachable!(),
        };

        let mut victim = None;
        for (slot, &frame_id) in list.iter_lru() {
            if self.alive.get(&frame_id).is_some_and(|s| s.evictable) {
                victim = Some((slot, frame_id));
                break;
            }
        }
        let (slot, frame_id) = victim?;
        let status = self.alive.remove(&frame_id)?;

        let (ghost_region, ghost_slot) = match region {
            Region::Mru => {
                self.mru.remove(slot);
                (Region::MruGhost, self.mru_ghost.push_front(status.page_id))
            }
            Region::Mfu => {
                self.mfu.remove(slot);
                (Region::MfuGhost, self.mfu_ghost.push_front(status.page_id))
            }
            Region::MruGhost | Region::MfuGhost => unreachable!(),
        };
        self.ghost.insert(
            status.page_id,
            FrameStatus {
                page_id: status.page_id,
                frame_id,
                evictable: false,
                region: ghost_region,
                slot: ghost_slot,
            },
        );
        self.curr_size -= 1;
        Some(frame_id)
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(status) = self.alive.get_mut(&frame_id) else {
            log::error!("set_evictable on frame {frame_id}, which is not resident");
            panic!("frame {frame_id} is not resident in the replacer");
        };
        if status.evictable == evictable {
            return;
        }
        status.evictable = evictable;
        if evictable {
            self.curr_size += 1;
        } else {
            self.curr_size -= 1;
        }
    }

    fn remove(&mut self, frame_id: FrameId) {
        match self.alive.get(&frame_id) {
            None => return,
            Some(status) if !status.evictable => {
                log::error!("remove of pinned frame {frame_id}");
                panic!("cannot remove frame {frame_id} while it is pinned");
            }
            Some(_) => {}
        }
        if let Some(status) = self.alive.remove(&frame_id) {
            match status.region {
                Region::Mru => {
                    self.mru.remove(status.slot);
                }
                Region::Mfu => {
                    self.mfu.remove(status.slot);
                }
                Region::MruGhost | Region::MfuGhost => unreachable!(),
            }
            self.curr_size -= 1;
        }
    }
}

#[cfg(test)]
impl ArcReplacer {
    /// (mru, mfu, mru_ghost, mfu_ghost) lengths.
    fn lens(&self) -> (usize, usize, usize, usize) {
        let inner = self.inner.lock().unwrap();
        (
            inner.mru.len(),
            inner.mfu.len(),
            inner.mru_ghost.len(),
            inner.mfu_ghost.len(),
        )
    }

    fn target_size(&self) -> usize {
        self.inner.lock().unwrap().mru_target_size
    }

    /// Resident frames of one side, MRU end first.
    fn resident_frames(&self, region: Region) -> Vec<FrameId> {
        let inner = self.inner.lock().unwrap();
        let list = match region {
            Region::Mru => &inner.mru,
            Region::Mfu => &inner.mfu,
            _ => panic!("not a resident region"),
        };
        list.iter().map(|(_, &frame_id)| frame_id).collect()
    }

    fn region_of_frame(&self, frame_id: FrameId) -> Option<Region> {
        self.inner
            .lock()
            .unwrap()
            .alive
            .get(&frame_id)
            .map(|s| s.region)
    }

    fn region_of_page(&self, page_id: PageId) -> Option<Region> {
        self.inner
            .lock()
            .unwrap()
            .ghost
            .get(&page_id)
            .map(|s| s.region)
    }

    /// Walks every list and index, asserting the structural invariants.
    fn check_invariants(&self) {
        let inner = self.inner.lock().unwrap();
        let n = inner.replacer_size;

        assert!(inner.mru.len() + inner.mru_ghost.len() <= n);
        assert!(
            inner.mru.len() + inner.mfu.len() + inner.mru_ghost.len() + inner.mfu_ghost.len()
                <= 2 * n
        );
        assert!(inner.mru_target_size <= n);

        // Indexes and lists name exactly the same entries, with matching
        // region tags and live slot handles.
        assert_eq!(inner.alive.len(), inner.mru.len() + inner.mfu.len());
        assert_eq!(
            inner.ghost.len(),
            inner.mru_ghost.len() + inner.mfu_ghost.len()
        );
        for (slot, frame_id) in inner.mru.iter() {
            let status = inner.alive.get(frame_id).expect("mru frame not in index");
            assert_eq!(status.region, Region::Mru);
            assert_eq!(status.slot, slot);
        }
        for (slot, frame_id) in inner.mfu.iter() {
            let status = inner.alive.get(frame_id).expect("mfu frame not in index");
            assert_eq!(status.region, Region::Mfu);
            assert_eq!(status.slot, slot);
        }
        for (slot, page_id) in inner.mru_ghost.iter() {
            let status = inner.ghost.get(page_id).expect("ghost page not in index");
            assert_eq!(status.region, Region::MruGhost);
            assert_eq!(status.slot, slot);
        }
        for (slot, page_id) in inner.mfu_ghost.iter() {
            let status = inner.ghost.get(page_id).expect("ghost page not in index");
            assert_eq!(status.region, Region::MfuGhost);
            assert_eq!(status.slot, slot);
        }

        // A page id appears in at most one list.
        let mut pages: Vec<PageId> = inner
            .alive
            .values()
            .map(|s| s.page_id)
            .chain(inner.ghost.keys().copied())
            .collect();
        pages.sort_unstable();
        pages.dedup();
        assert_eq!(pages.len(), inner.alive.len() + inner.ghost.len());

        let evictable = inner.alive.values().filter(|s| s.evictable).count();
        assert_eq!(evictable, inner.curr_size);
    }
}
