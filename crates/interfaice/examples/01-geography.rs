use anyhow::Result;
use futures::StreamExt;
use interfaice::{
    Deferred, InvokeError, ProxyFactory, ResponseStream, Transcode, ai_interface, init_tracing,
};

#[derive(Debug, Transcode)]
struct City {
    name: String,
    population: u64,
    #[transcode(default)]
    landmarks: Vec<String>,
}

#[ai_interface]
trait Geography {
    fn capital(&self, country: &str) -> Result<String, InvokeError>;

    #[ai_chat(description = "Order the cities by population, largest first")]
    fn largest_cities(&self, country: &str, limit: u8) -> ResponseStream<City>;

    fn area_km2(&self, country: &str) -> Deferred<f64>;

    async fn is_landlocked(&self, country: String) -> Result<bool, InvokeError>;
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_tracing()?;

    let geography: GeographyProxy = ProxyFactory::from_env()?.create();

    let capital = geography.capital("Korea")?;
    println!("capital: {capital}");

    let area = geography.area_km2("Korea").await?;
    println!("area: {area} km2");

    let landlocked = geography.is_landlocked("Mongolia".to_string()).await?;
    println!("Mongolia is landlocked: {landlocked}");

    let mut cities = geography.largest_cities("Japan", 3);
    while let Some(city) = cities.next().await {
        let city = city?;
        println!("{} ({}): {:?}", city.name, city.population, city.landmarks);
    }

    Ok(())
}
