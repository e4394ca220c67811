use super::*;

#[test]
fn test_page_request_default() {
    let request = PageRequest::default();
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, 20);
    assert_eq!(request.offset(), 0);
}

#[test]
fn test_page_request_offset_and_clamp() {
    let request = PageRequest {
        page: 3,
        per_page: 20,
    };
    assert_eq!(request.offset(), 40);

    let request = PageRequest {
        page: 0,
        per_page: 5000,
    };
    assert_eq!(request.offset(), 0);
    assert_eq!(request.limit(), 100);
}

#[test]
fn test_page_response_total_pages() {
    // 25 items, 10 per page -> 3 pages
    let response: PageResponse<i32> = PageResponse::new(vec![], 1, 10, 25);
    assert_eq!(response.meta.total_pages, 3);

    let response: PageResponse<i32> = PageResponse::new(vec![], 1, 10, 0);
    assert_eq!(response.meta.total_pages, 1);
}

#[test]
fn test_page_response_from_items() {
    let items: Vec<u32> = (1..=25).collect();
    let page = PageResponse::from_items(
        items,
        PageRequest {
            page: 3,
            per_page: 10,
        },
    );
    assert_eq!(page.data, vec![21, 22, 23, 24, 25]);
    assert_eq!(page.meta.total, 25);
    assert_eq!(page.meta.total_pages, 3);
}
