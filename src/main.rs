#[actix_web::main]
async fn main() -> std::io::Result<()> {
    equipviz_lib::run().await
}
