use uuid::Uuid;

pub(super) fn generate_job_id() -> String {
    format!(
        "pickup_job/{}",
        Uuid::new_v4()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
    )
}
