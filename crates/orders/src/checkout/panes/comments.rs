//! Order comments pane.

use storekeep_core::UserId;

use crate::checkout::{CheckoutPane, PaneContext, PaneError, PaneField, PaneInput, PaneView, ReviewLine};
use crate::models::{Order, OrderComment};

const COMMENTS: &str = "comments";

/// Free-text special instructions, kept in the pane's own namespace until
/// the order is submitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommentsPane;

impl CommentsPane {
    fn current(order: &Order) -> Option<&str> {
        order
            .pane_data(COMMENTS)
            .and_then(|data| data.text(COMMENTS))
            .filter(|text| !text.is_empty())
    }
}

impl CheckoutPane for CommentsPane {
    fn id(&self) -> &str {
        COMMENTS
    }

    fn title(&self) -> &str {
        "Order comments"
    }

    fn weight(&self) -> i32 {
        7
    }

    fn view(&self, order: &Order, _ctx: &PaneContext<'_>) -> PaneView {
        PaneView {
            pane: self.id().to_string(),
            title: self.title().to_string(),
            notes: vec![
                "Use this area for special instructions or questions regarding your order."
                    .to_string(),
            ],
            fields: vec![PaneField::text(
                COMMENTS,
                "Order comments",
                Self::current(order).unwrap_or_default(),
            )],
            errors: Vec::new(),
        }
    }

    fn process(&self, order: &mut Order, input: &PaneInput, _ctx: &PaneContext<'_>) -> Result<(), PaneError> {
        let data = order.pane_data_mut(COMMENTS);
        match input.value(COMMENTS) {
            Some(text) => {
                data.insert(COMMENTS, text);
            }
            None => {
                data.remove(COMMENTS);
            }
        }
        Ok(())
    }

    fn review(&self, order: &Order, _ctx: &PaneContext<'_>) -> Option<Vec<ReviewLine>> {
        Self::current(order).map(|text| vec![ReviewLine::new("Comment", text)])
    }

    fn complete(&self, order: &mut Order) {
        if let Some(text) = Self::current(order).map(str::to_string) {
            let mut comment = OrderComment::new(UserId::ANONYMOUS, text, order.status_id().clone());
            comment.notified = true;
            order.comments.push(comment);
        }
    }
}
