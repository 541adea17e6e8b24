mod read;
mod write;

const POST_COLUMNS: &str = "p.id, p.content, p.author_id, p.created_at";
