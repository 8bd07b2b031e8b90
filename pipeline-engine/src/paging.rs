//! FILENAME: pipeline-engine/src/paging.rs
//! Paging Engine - Slices a processed sequence into one page.
//!
//! Paging is the last stage, so it slices whatever the earlier stages
//! produced (plain records, or header-interleaved rows). Every call
//! rewrites the state's metadata: page count, total record count, and a
//! validation error instead of a panic when the request is out of range.

use crate::definition::{PagingError, PagingMetadata, PagingState};

/// Returns the requested page and records the outcome in `state.metadata`.
///
/// Invalid requests return an empty page: a zero page size reports
/// `IncorrectRecordsPerPage`, an index past the last page reports
/// `IncorrectPageIndex`. An empty input is a valid empty page, not an
/// error. Callers wanting clamping instead of errors run
/// [`correct_paging_state`] first.
pub fn page<T: Clone>(data: &[T], state: &mut PagingState) -> Vec<T> {
    let len = data.len();
    let mut metadata = PagingMetadata {
        count_pages: 0,
        count_records: len,
        error: PagingError::None,
    };

    if state.records_per_page == 0 {
        metadata.error = PagingError::IncorrectRecordsPerPage;
        state.metadata = Some(metadata);
        return Vec::new();
    }

    metadata.count_pages = count_pages(len, state.records_per_page);
    if len == 0 {
        state.metadata = Some(metadata);
        return Vec::new();
    }
    if state.index >= metadata.count_pages {
        metadata.error = PagingError::IncorrectPageIndex;
        state.metadata = Some(metadata);
        return Vec::new();
    }

    state.metadata = Some(metadata);
    let (start, end) = page_window(state, len);
    data[start..end].to_vec()
}

/// The half-open row range a valid page request covers.
pub fn page_window(state: &PagingState, total_records: usize) -> (usize, usize) {
    let start = (state.index * state.records_per_page).min(total_records);
    let end = (start + state.records_per_page).min(total_records);
    (start, end)
}

pub fn count_pages(total_records: usize, records_per_page: usize) -> usize {
    if records_per_page == 0 {
        return 0;
    }
    total_records.div_ceil(records_per_page)
}

/// Clamps the page index into range for the given total. An empty total
/// resets to the first page. A zero page size is left for [`page`] to
/// report.
pub fn correct_paging_state(state: &mut PagingState, total_records: usize) {
    if state.records_per_page == 0 {
        return;
    }
    let pages = count_pages(total_records, state.records_per_page);
    if pages == 0 {
        state.index = 0;
    } else if state.index >= pages {
        state.index = pages - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_first_page_and_last_partial_page() {
        let data = numbers(7);

        let mut state = PagingState::new(0, 2);
        assert_eq!(page(&data, &mut state), vec![0, 1]);
        let metadata = state.metadata.unwrap();
        assert_eq!(metadata.count_pages, 4);
        assert_eq!(metadata.count_records, 7);
        assert_eq!(metadata.error, PagingError::None);

        let mut state = PagingState::new(3, 2);
        assert_eq!(page(&data, &mut state), vec![6]);
    }

    #[test]
    fn test_index_past_the_end_is_an_error() {
        let data = numbers(7);
        let mut state = PagingState::new(5, 2);

        assert!(page(&data, &mut state).is_empty());
        let metadata = state.metadata.unwrap();
        assert_eq!(metadata.error, PagingError::IncorrectPageIndex);
        // Counts are still reported so the caller can correct the index.
        assert_eq!(metadata.count_pages, 4);
        assert_eq!(metadata.count_records, 7);
    }

    #[test]
    fn test_zero_page_size_is_an_error() {
        let data = numbers(3);
        let mut state = PagingState::new(0, 0);

        assert!(page(&data, &mut state).is_empty());
        let metadata = state.metadata.unwrap();
        assert_eq!(metadata.error, PagingError::IncorrectRecordsPerPage);
        assert_eq!(metadata.count_pages, 0);
    }

    #[test]
    fn test_empty_input_is_a_valid_empty_page() {
        let data: Vec<usize> = Vec::new();
        let mut state = PagingState::new(0, 10);

        assert!(page(&data, &mut state).is_empty());
        let metadata = state.metadata.unwrap();
        assert_eq!(metadata.error, PagingError::None);
        assert_eq!(metadata.count_pages, 0);
        assert_eq!(metadata.count_records, 0);
    }

    #[test]
    fn test_correction_clamps_to_last_page() {
        let mut state = PagingState::new(5, 2);
        correct_paging_state(&mut state, 7);
        assert_eq!(state.index, 3);

        let corrected = page(&numbers(7), &mut state);
        assert_eq!(corrected, vec![6]);
        assert_eq!(state.metadata.unwrap().error, PagingError::None);
    }

    #[test]
    fn test_correction_resets_on_empty_total() {
        let mut state = PagingState::new(4, 2);
        correct_paging_state(&mut state, 0);
        assert_eq!(state.index, 0);
    }

    #[test]
    fn test_correction_leaves_valid_index_alone() {
        let mut state = PagingState::new(1, 2);
        correct_paging_state(&mut state, 7);
        assert_eq!(state.index, 1);
    }

    #[test]
    fn test_correction_skips_zero_page_size() {
        let mut state = PagingState::new(9, 0);
        correct_paging_state(&mut state, 7);
        assert_eq!(state.index, 9);
    }

    #[test]
    fn test_metadata_rewritten_every_call() {
        let data = numbers(4);
        let mut state = PagingState::new(9, 2);
        page(&data, &mut state);
        assert_eq!(state.metadata.unwrap().error, PagingError::IncorrectPageIndex);

        state.index = 0;
        page(&data, &mut state);
        assert_eq!(state.metadata.unwrap().error, PagingError::None);
    }
}
