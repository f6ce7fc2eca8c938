use super::Scroll;

#[test]
fn it_starts_at_the_top() {
    let scroll = Scroll::default();
    assert_eq!(scroll.position, 0);
}

#[test]
fn it_jumps_to_the_last_line() {
    let mut scroll = Scroll::default();
    scroll.set_state(50, 20);
    scroll.last();

    assert_eq!(scroll.position, 30);
}

#[test]
fn it_stays_at_the_top_when_content_fits() {
    let mut scroll = Scroll::default();
    scroll.set_state(10, 20);
    scroll.last();
    scroll.down();

    assert_eq!(scroll.position, 0);
}

#[test]
fn it_clamps_scrolling_down() {
    let mut scroll = Scroll::default();
    scroll.set_state(25, 20);
    scroll.down_page();

    assert_eq!(scroll.position, 5);
}

#[test]
fn it_clamps_scrolling_up() {
    let mut scroll = Scroll::default();
    scroll.set_state(50, 20);
    scroll.down();
    scroll.down();
    scroll.up_page();

    assert_eq!(scroll.position, 0);
}

#[test]
fn it_clamps_the_position_when_content_shrinks() {
    let mut scroll = Scroll::default();
    scroll.set_state(50, 20);
    scroll.last();
    scroll.set_state(30, 20);

    assert_eq!(scroll.position, 10);
}
