use poise::serenity_prelude as serenity;
use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

pub const QUEUE_PREV_ID: &str = "queue_prev";
pub const QUEUE_NEXT_ID: &str = "queue_next";

/// Whether the queue can page (backwards, forwards) from `page`
pub fn queue_page_turns(page: usize, pages: usize) -> (bool, bool) {
    (page > 0, page + 1 < pages)
}

/// The page shown after pressing the button with `custom_id`
pub fn turn_queue_page(page: usize, pages: usize, custom_id: &str) -> usize {
    let last = pages.saturating_sub(1);
    let page = page.min(last);
    match custom_id {
        QUEUE_PREV_ID => page.saturating_sub(1),
        QUEUE_NEXT_ID => (page + 1).min(last),
        _ => page,
    }
}

/// Creates the ◀/▶ row for a paged queue listing
pub fn queue_page_buttons(page: usize, pages: usize) -> Vec<CreateActionRow> {
    let (can_go_back, can_go_forward) = queue_page_turns(page, pages);

    let prev = CreateButton::new(QUEUE_PREV_ID)
        .emoji(ReactionType::Unicode("◀️".to_string()))
        .style(ButtonStyle::Secondary)
        .disabled(!can_go_back);

    let next = CreateButton::new(QUEUE_NEXT_ID)
        .emoji(ReactionType::Unicode("▶️".to_string()))
        .style(ButtonStyle::Secondary)
        .disabled(!can_go_forward);

    vec![CreateActionRow::Buttons(vec![prev, next])]
}
